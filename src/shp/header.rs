////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
#[cfg(test)]
use test_strategy::Arbitrary;

use crate::{WestwoodError, WestwoodResult};

/// Bytes between the end of the frame table and the first frame
pub const TABLE_PADDING: usize = 16;

/// Length of the file header in front of the frame table
pub const HEADER_LENGTH: usize = 14;

/// Length of one frame table entry
pub const ENTRY_LENGTH: usize = 8;

/// How a frame's data is stored
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(test, derive(Arbitrary))]
pub enum FrameFormat {
    /// XOR delta over the frame stored at [FrameEntry::ref_offset]
    XorLcw = 0x40,
    /// XOR delta over the previous frame
    XorPrev = 0x20,
    /// Standalone LCW stream
    Lcw = 0x80,
}

impl TryFrom<u8> for FrameFormat {
    type Error = WestwoodError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x40 => Ok(Self::XorLcw),
            0x20 => Ok(Self::XorPrev),
            0x80 => Ok(Self::Lcw),
            _ => Err(WestwoodError::InvalidHeader("unknown sprite frame format")),
        }
    }
}

/// ## Structure
/// - Little Endian u24: file offset of the frame data
/// - u8: [FrameFormat]
/// - Little Endian u16: file offset of the reference frame
/// - Little Endian u16: format of the reference frame
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FrameEntry {
    pub offset: u32,
    pub format: FrameFormat,
    pub ref_offset: u16,
    pub ref_format: u16,
}

impl FrameEntry {
    /// # Errors
    /// - [WestwoodError::InvalidHeader]: unknown frame format
    /// - [WestwoodError::Io]: the reader ran out
    pub fn read(reader: &mut impl Read) -> WestwoodResult<Self> {
        let packed = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            offset: packed & 0x00FF_FFFF,
            format: FrameFormat::try_from((packed >> 24) as u8)?,
            ref_offset: reader.read_u16::<LittleEndian>()?,
            ref_format: reader.read_u16::<LittleEndian>()?,
        })
    }

    /// # Errors
    /// Returns [WestwoodError::Io] if the write failed
    pub fn write(&self, writer: &mut impl Write) -> WestwoodResult<()> {
        writer.write_u32::<LittleEndian>(self.offset | (self.format as u32) << 24)?;
        writer.write_u16::<LittleEndian>(self.ref_offset)?;
        writer.write_u16::<LittleEndian>(self.ref_format)?;
        Ok(())
    }
}

/// Sprite file header
///
/// ## Structure
/// - Little Endian u16: frame count
/// - 4 bytes: unused
/// - Little Endian u16: width, u16: height
/// - 4 bytes: unused
/// - frame count [FrameEntry]s
/// - 16 bytes: unused
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ShpHeader {
    pub width: u16,
    pub height: u16,
    pub frames: Vec<FrameEntry>,
}

impl ShpHeader {
    /// # Errors
    /// - [WestwoodError::InvalidHeader]: unknown frame format
    /// - [WestwoodError::Io]: the reader ran out
    pub fn read(reader: &mut impl Read) -> WestwoodResult<Self> {
        let count = reader.read_u16::<LittleEndian>()?;
        let _ = reader.read_u32::<LittleEndian>()?;
        let width = reader.read_u16::<LittleEndian>()?;
        let height = reader.read_u16::<LittleEndian>()?;
        let _ = reader.read_u32::<LittleEndian>()?;

        let frames = (0..count)
            .map(|_| FrameEntry::read(reader))
            .collect::<WestwoodResult<Vec<_>>>()?;
        let mut padding = [0; TABLE_PADDING];
        reader.read_exact(&mut padding)?;

        Ok(Self {
            width,
            height,
            frames,
        })
    }

    /// # Errors
    /// Returns [WestwoodError::Io] if the write failed
    pub fn write(&self, writer: &mut impl Write) -> WestwoodResult<()> {
        writer.write_u16::<LittleEndian>(self.frames.len() as u16)?;
        writer.write_u32::<LittleEndian>(0)?;
        writer.write_u16::<LittleEndian>(self.width)?;
        writer.write_u16::<LittleEndian>(self.height)?;
        writer.write_u32::<LittleEndian>(0)?;
        for frame in &self.frames {
            frame.write(writer)?;
        }
        writer.write_all(&[0; TABLE_PADDING])?;
        Ok(())
    }

    /// Length of the header and frame table
    #[must_use]
    pub fn length(&self) -> usize {
        HEADER_LENGTH + self.frames.len() * ENTRY_LENGTH + TABLE_PADDING
    }
}
