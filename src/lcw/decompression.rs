////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! Decompression parsing and algorithms.
//!
//! The stream is a sequence of commands, each starting with a control byte
//! whose top bits select the command (see [Command](crate::lcw::command::Command)).
//! Decoding walks the commands until the end of stream command and writes into a
//! destination whose size is fixed up front by the caller.
//!
//! Copy commands may overlap the bytes they are producing. In that case the
//! copy runs a byte at a time and the output repeats, so a copy with distance
//! 1 turns into a run of the previous byte:
//!
//! ```text
//! 05 __ __ __ __ __     copy distance 1, length 5
//! ^  ^
//! S  O
//!
//! 05 05 05 05 05 05
//! ```
use std::io::{Read, Write};

use log::warn;

use crate::lcw::command::Command;
use crate::lcw::{
    copy_back,
    copy_literal,
    fill,
    CompressedBlob,
    DecodeError,
    DecodeOptions,
    OffsetMode,
    OverrunPolicy,
};
use crate::{WestwoodError, WestwoodResult};

// Resolves the source index of a medium or long copy
#[inline(always)]
fn copy_source(
    offsets: OffsetMode,
    position: usize,
    offset: u16,
) -> Result<usize, DecodeError> {
    match offsets {
        OffsetMode::Absolute => Ok(offset as usize),
        OffsetMode::Relative => position
            .checked_sub(offset as usize)
            .ok_or(DecodeError::CorruptStream(offset as usize, position)),
    }
}

#[inline(always)]
fn execute(
    command: Command,
    blob: &mut CompressedBlob,
    buffer: &mut [u8],
    position: usize,
    offsets: OffsetMode,
) -> Result<usize, DecodeError> {
    match command {
        Command::Short { distance, length } => {
            let source = position
                .checked_sub(distance as usize)
                .ok_or(DecodeError::CorruptStream(distance as usize, position))?;
            copy_back(buffer, position, source, length as usize)
        }
        Command::Literal(literal) => {
            let bytes = blob.read_slice(literal as usize)?;
            copy_literal(buffer, position, bytes)
        }
        Command::Medium { offset, length } | Command::Long { offset, length } => {
            let source = copy_source(offsets, position, offset)?;
            copy_back(buffer, position, source, length as usize)
        }
        Command::Fill { length, value } => fill(buffer, position, length as usize, value),
        Command::Stop => Ok(position),
    }
}

/// Decode an LCW stream into a preallocated destination.
///
/// Decoding starts at the first byte of `src`; callers holding a stream at an
/// offset inside a larger buffer pass the subslice.
///
/// # Returns
/// The number of bytes written to `dst`
///
/// # Errors
/// - [WestwoodError::ControlError]: a command was invalid, the stream ended
///   before the end of stream command, or (with [OverrunPolicy::Strict]) a
///   command would write past the end of `dst`. `position` is the offset of
///   the offending command in `src`.
pub fn decode_into(src: &[u8], dst: &mut [u8], options: DecodeOptions) -> WestwoodResult<usize> {
    let mut blob = CompressedBlob::new(src);
    let mut position = 0usize;

    loop {
        let command_position = blob.position();
        let command = Command::read(&mut blob).map_err(|error| {
            WestwoodError::ControlError {
                error,
                position: command_position,
            }
        })?;

        if command.is_stop() {
            break;
        }

        match execute(command, &mut blob, dst, position, options.offsets) {
            Ok(new_position) => position = new_position,
            Err(DecodeError::BufferOverrun(over))
                if options.overrun == OverrunPolicy::Lenient =>
            {
                warn!(
                    "LCW command at {command_position} overran destination by {over} bytes, \
                     truncating at {position}"
                );
                return Ok(position);
            }
            Err(error) => {
                return Err(WestwoodError::ControlError {
                    error,
                    position: command_position,
                })
            }
        }
    }

    Ok(position)
}

/// Decode an LCW stream into a new buffer of `length` bytes.
///
/// Bytes the stream does not cover stay zero. This includes the tail left
/// behind when [OverrunPolicy::Lenient] truncates the output.
///
/// # Errors
/// See [decode_into]
#[inline]
pub fn decode(src: &[u8], length: usize, options: DecodeOptions) -> WestwoodResult<Vec<u8>> {
    let mut buffer = vec![0; length];
    decode_into(src, &mut buffer, options)?;
    Ok(buffer)
}

/// Decompress an LCW stream from a reader into a writer. The whole reader is
/// consumed; the output is always `length` bytes.
///
/// # Errors
/// - [WestwoodError::Io]: Generic IO error occurred while reading or writing
/// - See [decode_into] for decoding errors
pub fn decompress(
    length: usize,
    reader: &mut impl Read,
    writer: &mut impl Write,
    options: DecodeOptions,
) -> WestwoodResult<()> {
    let mut src = vec![];
    reader.read_to_end(&mut src)?;
    let data = decode(&src, length, options)?;

    writer.write_all(&data)?;
    writer.flush()?;

    Ok(())
}
