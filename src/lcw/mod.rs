////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! LCW (also known as "Format80") compression. Everything needed to turn a
//! headerless LCW stream back into bytes and to produce streams the decoder
//! accepts.
//!
//! An LCW stream carries no header of its own. The containers embedding it
//! record the decompressed length separately, so every entry point here takes
//! the destination length (or a preallocated destination) from the caller.

use byteorder::{ByteOrder, LittleEndian};
use onlyerror::Error;

pub mod command;
pub mod compression;
pub mod decompression;

pub use compression::{compress, encode, CompressionOptions};
pub use decompression::{decode, decode_into, decompress};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Error indicating that a copy command pointed at or past the current
    /// output position. LCW can only ever copy from bytes that are already
    /// decoded, so this indicates malformed or corrupted data.
    ///
    /// ### Fields
    /// - usize: offset or distance read from the command
    /// - usize: output position when the command was read
    #[error("Copy offset `{0}` does not point behind output position `{1}`")]
    CorruptStream(usize, usize),
    /// Error indicating that the input ran out before the end-of-stream
    /// command was read.
    ///
    /// ### Fields
    /// - usize: input position at which more bytes were needed
    #[error("Input ended at position `{0}` before the end of stream command")]
    TruncatedStream(usize),
    /// Error indicating that a command would write past the end of the
    /// destination.
    ///
    /// This error exists to prevent maliciously constructed data from writing
    /// past the size declared by the containing format
    ///
    /// ### Fields
    /// - usize: amount of bytes attempted to write past
    #[error("Decompressed data overran destination capacity by `{0}` bytes")]
    BufferOverrun(usize),
}

/// What to do when a command would write past the end of the destination.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum OverrunPolicy {
    /// Fail with [DecodeError::BufferOverrun]. Meant for validation tooling.
    #[default]
    Strict,
    /// Stop before the offending command and return what was decoded so far.
    /// A number of shipped assets rely on this.
    Lenient,
}

/// How the 16 bit source word of long copy commands is interpreted.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum OffsetMode {
    /// The word is an index from the start of the output
    #[default]
    Absolute,
    /// The word is a distance back from the current output position. Later
    /// video files flag these streams with a leading `0x00` byte.
    Relative,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct DecodeOptions {
    pub overrun: OverrunPolicy,
    pub offsets: OffsetMode,
}

impl DecodeOptions {
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            overrun: OverrunPolicy::Lenient,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_offsets(self, offsets: OffsetMode) -> Self {
        Self { offsets, ..self }
    }
}

/// Forward only cursor over a compressed stream. Every read is bounds checked
/// and reports where the input ran out.
#[derive(Debug, Clone)]
pub(crate) struct CompressedBlob<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> CompressedBlob<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    #[inline(always)]
    pub(crate) fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .data
            .get(self.position)
            .ok_or(DecodeError::TruncatedStream(self.position))?;
        self.position += 1;
        Ok(byte)
    }

    #[inline(always)]
    pub(crate) fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_slice(2)?;
        Ok(LittleEndian::read_u16(bytes))
    }

    #[inline(always)]
    pub(crate) fn read_slice(&mut self, length: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.position + length;
        let slice = self
            .data
            .get(self.position..end)
            .ok_or(DecodeError::TruncatedStream(self.data.len()))?;
        self.position = end;
        Ok(slice)
    }
}

/// Checks that `length` more bytes fit in `buffer` at `position`.
#[inline(always)]
pub(crate) fn check_capacity(
    buffer: &[u8],
    position: usize,
    length: usize,
) -> Result<(), DecodeError> {
    if position + length > buffer.len() {
        return Err(DecodeError::BufferOverrun(position + length - buffer.len()));
    }
    Ok(())
}

/// Copies `length` already decoded bytes starting at `source` to `position`.
///
/// When the source range runs into the bytes being written the copy is done a
/// byte at a time so that the output repeats. A distance of 1 therefore
/// replicates the single preceding byte.
///
/// If this function errors no data will have been copied
///
/// # Errors
/// - [DecodeError::CorruptStream]: `source` >= `position`
/// - [DecodeError::BufferOverrun]: `position + length` > `buffer.len()`
///
/// # Returns
/// the new position of the buffer after the copy
#[inline(always)]
pub(crate) fn copy_back(
    buffer: &mut [u8],
    position: usize,
    source: usize,
    length: usize,
) -> Result<usize, DecodeError> {
    if source >= position {
        return Err(DecodeError::CorruptStream(source, position));
    }
    check_capacity(buffer, position, length)?;

    if source + length <= position {
        buffer.copy_within(source..source + length, position);
    } else {
        for i in 0..length {
            buffer[position + i] = buffer[source + i];
        }
    }

    Ok(position + length)
}

/// Writes `length` copies of `value` at `position`.
///
/// # Errors
/// - [DecodeError::BufferOverrun]: `position + length` > `buffer.len()`
#[inline(always)]
pub(crate) fn fill(
    buffer: &mut [u8],
    position: usize,
    length: usize,
    value: u8,
) -> Result<usize, DecodeError> {
    check_capacity(buffer, position, length)?;
    buffer[position..position + length].fill(value);
    Ok(position + length)
}

/// Copies literal bytes from the stream to `position`.
///
/// # Errors
/// - [DecodeError::BufferOverrun]: the literal does not fit
#[inline(always)]
pub(crate) fn copy_literal(
    buffer: &mut [u8],
    position: usize,
    bytes: &[u8],
) -> Result<usize, DecodeError> {
    check_capacity(buffer, position, bytes.len())?;
    buffer[position..position + bytes.len()].copy_from_slice(bytes);
    Ok(position + bytes.len())
}
