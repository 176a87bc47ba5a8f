////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! The VQA file preamble: container magic, the `VQHD` header and the frame
//! offset table.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
#[cfg(test)]
use test_strategy::Arbitrary;

use crate::vqa::blocks::BlockGeometry;
use crate::vqa::chunk::{skip_padding, ChunkHeader, Tag, FINF, FORM, VQHD, WVQA};
use crate::{WestwoodError, WestwoodResult};

/// Length of the `VQHD` payload
pub const HEADER_LENGTH: u32 = 42;

/// Set in [VqaHeader::flags] for 15 bit colour videos
pub const HIGH_COLOUR_FLAG: u16 = 0x10;

/// Flag bit stored in frame offsets that carries no position information
pub const OFFSET_FLAG: u32 = 0x4000_0000;

/// Decoded `VQHD` chunk
///
/// ## Structure
/// All values Little Endian
/// - u16: version
/// - u16: flags
/// - u16: frame count
/// - u16: width, u16: height
/// - u8: block width, u8: block height
/// - u8: framerate
/// - u8: codebook parts
/// - u16: colours, u16: max blocks
/// - u16, u32: unknown
/// - u16: sample rate, u8: channels, u8: sample bits
/// - u32, u16: unknown
/// - u32: max compressed codebook size (unreliable)
/// - u32: unknown
#[derive(Eq, PartialEq, Debug, Default, Copy, Clone)]
#[cfg_attr(test, derive(Arbitrary))]
pub struct VqaHeader {
    pub version: u16,
    pub flags: u16,
    pub frame_count: u16,
    pub width: u16,
    pub height: u16,
    pub block_width: u8,
    pub block_height: u8,
    pub framerate: u8,
    pub codebook_parts: u8,
    pub num_colors: u16,
    pub max_blocks: u16,
    pub unknown_a: u16,
    pub unknown_b: u32,
    pub sample_rate: u16,
    pub channels: u8,
    pub sample_bits: u8,
    pub unknown_c: u32,
    pub unknown_d: u16,
    pub max_cbfz_size: u32,
    pub unknown_e: u32,
}

impl VqaHeader {
    /// Reads the `VQHD` payload
    ///
    /// # Errors
    /// Returns [WestwoodError::Io](crate::WestwoodError::Io) if the reader ran out
    pub fn read(reader: &mut impl Read) -> WestwoodResult<Self> {
        Ok(Self {
            version: reader.read_u16::<LittleEndian>()?,
            flags: reader.read_u16::<LittleEndian>()?,
            frame_count: reader.read_u16::<LittleEndian>()?,
            width: reader.read_u16::<LittleEndian>()?,
            height: reader.read_u16::<LittleEndian>()?,
            block_width: reader.read_u8()?,
            block_height: reader.read_u8()?,
            framerate: reader.read_u8()?,
            codebook_parts: reader.read_u8()?,
            num_colors: reader.read_u16::<LittleEndian>()?,
            max_blocks: reader.read_u16::<LittleEndian>()?,
            unknown_a: reader.read_u16::<LittleEndian>()?,
            unknown_b: reader.read_u32::<LittleEndian>()?,
            sample_rate: reader.read_u16::<LittleEndian>()?,
            channels: reader.read_u8()?,
            sample_bits: reader.read_u8()?,
            unknown_c: reader.read_u32::<LittleEndian>()?,
            unknown_d: reader.read_u16::<LittleEndian>()?,
            max_cbfz_size: reader.read_u32::<LittleEndian>()?,
            unknown_e: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Writes the `VQHD` payload
    ///
    /// # Errors
    /// Returns [WestwoodError::Io](crate::WestwoodError::Io) if the write failed
    pub fn write(&self, writer: &mut impl Write) -> WestwoodResult<()> {
        writer.write_u16::<LittleEndian>(self.version)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u16::<LittleEndian>(self.frame_count)?;
        writer.write_u16::<LittleEndian>(self.width)?;
        writer.write_u16::<LittleEndian>(self.height)?;
        writer.write_u8(self.block_width)?;
        writer.write_u8(self.block_height)?;
        writer.write_u8(self.framerate)?;
        writer.write_u8(self.codebook_parts)?;
        writer.write_u16::<LittleEndian>(self.num_colors)?;
        writer.write_u16::<LittleEndian>(self.max_blocks)?;
        writer.write_u16::<LittleEndian>(self.unknown_a)?;
        writer.write_u32::<LittleEndian>(self.unknown_b)?;
        writer.write_u16::<LittleEndian>(self.sample_rate)?;
        writer.write_u8(self.channels)?;
        writer.write_u8(self.sample_bits)?;
        writer.write_u32::<LittleEndian>(self.unknown_c)?;
        writer.write_u16::<LittleEndian>(self.unknown_d)?;
        writer.write_u32::<LittleEndian>(self.max_cbfz_size)?;
        writer.write_u32::<LittleEndian>(self.unknown_e)?;
        Ok(())
    }

    #[must_use]
    pub fn is_high_colour(&self) -> bool {
        self.flags & HIGH_COLOUR_FLAG != 0
    }

    #[must_use]
    pub fn geometry(&self) -> BlockGeometry {
        BlockGeometry::new(
            self.width as usize,
            self.height as usize,
            self.block_width as usize,
            self.block_height as usize,
        )
    }

    /// # Errors
    /// Returns [WestwoodError::InvalidHeader](crate::WestwoodError::InvalidHeader)
    /// for headers no frame can be decoded with
    pub fn validate(&self) -> WestwoodResult<()> {
        if self.block_width == 0 || self.block_height == 0 {
            return Err(WestwoodError::InvalidHeader("block size is zero"));
        }
        if self.num_colors > 256 {
            return Err(WestwoodError::InvalidHeader("more than 256 palette colours"));
        }
        if self.channels > 2 {
            return Err(WestwoodError::InvalidHeader("more than 2 audio channels"));
        }
        Ok(())
    }
}

fn expect_magic(reader: &mut impl Read, magic: Tag) -> WestwoodResult<()> {
    let mut tag = [0; 4];
    reader.read_exact(&mut tag)?;
    if tag != magic {
        return Err(WestwoodError::BadMagic(tag));
    }
    Ok(())
}

/// Reads everything in front of the first frame: the `FORM`/`WVQA` magic,
/// the header, any metadata records, and the frame offset table of `FINF`.
///
/// Metadata records are any chunk whose tag ends in `F`. They are skipped.
///
/// # Returns
/// The header and the absolute file position of every frame
///
/// # Errors
/// - [WestwoodError::BadMagic]: the file isn't a VQA file
/// - [WestwoodError::InvalidHeader]: see [VqaHeader::validate]
/// - [WestwoodError::UnknownChunk]: a chunk other than a metadata record
///   appeared before `FINF`
/// - [WestwoodError::Io]: the file ended early
pub fn read_preamble(reader: &mut (impl Read + Seek)) -> WestwoodResult<(VqaHeader, Vec<u64>)> {
    expect_magic(reader, FORM)?;
    let _form_length = reader.read_u32::<BigEndian>()?;
    expect_magic(reader, WVQA)?;
    expect_magic(reader, VQHD)?;
    let header_length = reader.read_u32::<BigEndian>()?;

    let header = VqaHeader::read(reader)?;
    if header_length > HEADER_LENGTH {
        reader.seek(SeekFrom::Current(i64::from(header_length - HEADER_LENGTH)))?;
    }
    header.validate()?;
    debug!(
        "VQA v{} {}x{} with {} frames, {}x{} blocks, {} codebook parts, flags {:#06x}",
        header.version,
        header.width,
        header.height,
        header.frame_count,
        header.block_width,
        header.block_height,
        header.codebook_parts,
        header.flags
    );

    loop {
        skip_padding(reader)?;
        let chunk = ChunkHeader::read(reader)?;
        if chunk.tag == FINF {
            break;
        }
        if chunk.tag[3] != b'F' {
            return Err(WestwoodError::UnknownChunk(chunk.tag));
        }
        reader.seek(SeekFrom::Current(i64::from(chunk.length)))?;
    }

    let offsets = (0..header.frame_count)
        .map(|_| {
            let raw = reader.read_u32::<LittleEndian>()?;
            Ok(u64::from(raw & !OFFSET_FLAG) << 1)
        })
        .collect::<WestwoodResult<Vec<_>>>()?;

    Ok((header, offsets))
}

/// Writes a preamble readable by [read_preamble]. Offsets must be even.
///
/// # Errors
/// Returns [WestwoodError::Io](crate::WestwoodError::Io) if the write failed
pub fn write_preamble(
    writer: &mut impl Write,
    header: &VqaHeader,
    offsets: &[u64],
    form_length: u32,
) -> WestwoodResult<()> {
    writer.write_all(&FORM)?;
    writer.write_u32::<BigEndian>(form_length)?;
    writer.write_all(&WVQA)?;
    ChunkHeader {
        tag: VQHD,
        length: HEADER_LENGTH,
    }
    .write(writer)?;
    header.write(writer)?;
    ChunkHeader {
        tag: FINF,
        length: offsets.len() as u32 * 4,
    }
    .write(writer)?;
    for offset in offsets {
        writer.write_u32::<LittleEndian>((offset >> 1) as u32)?;
    }
    Ok(())
}

/// Length of the output of [write_preamble] for `frames` frames
#[must_use]
pub fn preamble_length(frames: usize) -> u64 {
    12 + ChunkHeader::LENGTH + u64::from(HEADER_LENGTH) + ChunkHeader::LENGTH + frames as u64 * 4
}
