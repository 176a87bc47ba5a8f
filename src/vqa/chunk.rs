////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! IFF style chunks as found in VQA files.
//!
//! ## Structure
//! - 4 bytes: ASCII tag
//! - Big Endian u32: payload length
//! - payload
//!
//! Chunks start on even file positions. A chunk with an odd length is
//! followed by a single `0x00` pad byte.

use std::fmt::{Display, Formatter};
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::WestwoodResult;

pub type Tag = [u8; 4];

pub const FORM: Tag = *b"FORM";
pub const WVQA: Tag = *b"WVQA";
pub const VQHD: Tag = *b"VQHD";
pub const FINF: Tag = *b"FINF";

pub const VQFR: Tag = *b"VQFR";
pub const VQFL: Tag = *b"VQFL";
pub const SN2J: Tag = *b"SN2J";
pub const SND0: Tag = *b"SND0";
pub const SND2: Tag = *b"SND2";

pub const CPL0: Tag = *b"CPL0";
pub const CBF0: Tag = *b"CBF0";
pub const CBFZ: Tag = *b"CBFZ";
pub const CBP0: Tag = *b"CBP0";
pub const CBPZ: Tag = *b"CBPZ";
pub const VPTZ: Tag = *b"VPTZ";
pub const VPRZ: Tag = *b"VPRZ";
pub const VPTR: Tag = *b"VPTR";

/// Prints a tag as text, escaping anything that isn't printable ASCII.
#[derive(Debug, Clone, Copy)]
pub struct TagDisplay(pub Tag);

impl Display for TagDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub struct ChunkHeader {
    pub tag: Tag,
    pub length: u32,
}

impl ChunkHeader {
    pub const LENGTH: u64 = 8;

    /// Reads a chunk header.
    ///
    /// A tag starting with `0x00` is a pad byte that was not skipped, so the
    /// tag is shifted and completed with the next byte.
    ///
    /// # Errors
    /// Returns [WestwoodError::Io](crate::WestwoodError::Io) if the reader ran out
    pub fn read(reader: &mut impl Read) -> WestwoodResult<Self> {
        let mut tag = [0; 4];
        reader.read_exact(&mut tag)?;
        if tag[0] == 0 {
            tag.rotate_left(1);
            tag[3] = reader.read_u8()?;
        }
        let length = reader.read_u32::<BigEndian>()?;
        Ok(Self { tag, length })
    }

    /// # Errors
    /// Returns [WestwoodError::Io](crate::WestwoodError::Io) if the write failed
    pub fn write(self, writer: &mut impl Write) -> WestwoodResult<()> {
        writer.write_all(&self.tag)?;
        writer.write_u32::<BigEndian>(self.length)?;
        Ok(())
    }
}

/// Consumes the pad byte in front of a chunk when `reader` sits on an odd
/// position that holds `0x00`. Does nothing at the end of the stream.
///
/// # Errors
/// Returns [WestwoodError::Io](crate::WestwoodError::Io) on a failed seek
pub fn skip_padding(reader: &mut (impl Read + Seek)) -> WestwoodResult<()> {
    let position = reader.stream_position()?;
    if position % 2 == 0 {
        return Ok(());
    }
    let mut pad = [0; 1];
    if reader.read(&mut pad)? == 1 && pad[0] != 0 {
        reader.seek(SeekFrom::Current(-1))?;
    }
    Ok(())
}
