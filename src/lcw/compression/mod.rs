////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! LCW encoders. Exact output may be subject to change; the only contract is
//! that the decoder turns it back into the input.
//!
//! Both encoders track literal bytes as they are encountered and flush them
//! as literal commands of at most [LITERAL_MAX] bytes before any other
//! command is written. Runs of at least [FILL_LENGTH_MIN] identical bytes are
//! written as fill commands.
//!
//! Output always uses absolute offsets for medium and long copies.
//!
//! See [Command](crate::lcw::command::Command) for a specification of control
//! codes
mod fast;
mod fastest;
pub(crate) mod prefix_table;

use std::io::{Read, Write};

use crate::lcw::command::{Command, Control, LITERAL_MAX, LONG_LENGTH_MAX};
use crate::WestwoodResult;

/// Shortest run written as a fill command. A fill costs four bytes, so
/// shorter runs are cheaper as literals.
pub const FILL_LENGTH_MIN: usize = 4;

/// Length of the run of bytes equal to `input[position]`, capped at `max`
#[inline]
pub(crate) fn run_length(input: &[u8], position: usize, max: usize) -> usize {
    let value = input[position];
    input[position..]
        .iter()
        .take(max)
        .take_while(|&&byte| byte == value)
        .count()
}

/// Running block of literal bytes waiting to be written
#[derive(Debug, Default)]
pub(crate) struct LiteralBlock {
    bytes: Vec<u8>,
}

impl LiteralBlock {
    pub(crate) fn push(&mut self, byte: u8, controls: &mut Vec<Control>) {
        self.bytes.push(byte);
        // If it's reached the limit, push the block immediately and clear the
        // running block
        if self.bytes.len() >= LITERAL_MAX as usize {
            self.flush(controls);
        }
    }

    pub(crate) fn flush(&mut self, controls: &mut Vec<Control>) {
        if !self.bytes.is_empty() {
            controls.push(Control::new_literal_block(&self.bytes));
            self.bytes.clear();
        }
    }
}

/// Emits a fill command for the run starting at `position` if it is long
/// enough.
///
/// # Returns
/// the length of the run written, 0 if none was
#[inline]
pub(crate) fn try_fill(
    input: &[u8],
    position: usize,
    literal_block: &mut LiteralBlock,
    controls: &mut Vec<Control>,
) -> usize {
    let run = run_length(input, position, LONG_LENGTH_MAX as usize);
    if run < FILL_LENGTH_MIN {
        return 0;
    }
    literal_block.flush(controls);
    controls.push(Control::new(
        Command::Fill {
            length: run as u16,
            value: input[position],
        },
        vec![],
    ));
    run
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[non_exhaustive]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum CompressionOptions {
    /// Fill and literal commands only
    Fastest,
    /// Adds back-reference copies found through a prefix table
    #[default]
    Fast,
}

/// Encode a slice to an LCW stream, including the end of stream command.
#[must_use]
pub fn encode(input: &[u8], compression_options: CompressionOptions) -> Vec<u8> {
    let controls = match compression_options {
        CompressionOptions::Fastest => fastest::encode(input),
        CompressionOptions::Fast => fast::encode(input),
    };

    let mut out = Vec::with_capacity(input.len() / 2 + 1);
    for control in controls {
        // writing into a Vec cannot fail
        let _ = control.write(&mut out);
    }
    out
}

/// Compress `length` bytes from a reader to an LCW stream in a writer.
///
/// # Errors
/// - [WestwoodError::Io](crate::WestwoodError::Io): Generic IO error when
///   reading or writing
pub fn compress(
    length: usize,
    reader: &mut impl Read,
    writer: &mut impl Write,
    compression_options: CompressionOptions,
) -> WestwoodResult<()> {
    let mut buf = vec![0; length];
    reader.read_exact(buf.as_mut_slice())?;
    let out = encode(&buf, compression_options);
    writer.write_all(&out)?;
    Ok(())
}
