////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! SHP sprite files.
//!
//! Every frame is `width * height` palette indices. A frame is stored either
//! as a standalone [LCW](crate::lcw) stream or as an [XOR delta](crate::delta)
//! over another frame, which itself may be a delta. Frames are materialised
//! on request by resolving the chain down to a standalone frame, and cached.
//!
//! Chains are walked iteratively, so their length is bounded by memory
//! rather than the stack. A chain longer than the depth limit fails with
//! [WestwoodError::ChainTooDeep]. The default limit is the frame count, which
//! no well formed chain exceeds, so a file whose references loop fails
//! instead of looping forever.

use std::io::{Cursor, Read};

use log::{debug, trace};

use crate::delta::apply_xor;
use crate::lcw::{decode, DecodeOptions};
use crate::shp::header::{FrameEntry, FrameFormat, ShpHeader};
use crate::{WestwoodError, WestwoodResult};

pub mod header;

pub struct ShpReader {
    data: Vec<u8>,
    header: ShpHeader,
    cache: Vec<Option<Vec<u8>>>,
    depth_limit: usize,
}

impl ShpReader {
    /// Reads a whole sprite file. Frames are decoded on request.
    ///
    /// # Errors
    /// - [WestwoodError::InvalidHeader]: a frame has an unknown format
    /// - [WestwoodError::Io]: generic IO error while reading
    pub fn open(reader: &mut impl Read) -> WestwoodResult<Self> {
        let mut data = vec![];
        reader.read_to_end(&mut data)?;
        let header = ShpHeader::read(&mut Cursor::new(&data))?;
        debug!(
            "SHP {}x{} with {} frames",
            header.width,
            header.height,
            header.frames.len()
        );

        Ok(Self {
            data,
            cache: vec![None; header.frames.len()],
            depth_limit: header.frames.len(),
            header,
        })
    }

    /// Changes the longest delta chain [ShpReader::frame] follows
    #[must_use]
    pub fn with_depth_limit(self, depth_limit: usize) -> Self {
        Self {
            depth_limit,
            ..self
        }
    }

    #[must_use]
    pub fn header(&self) -> &ShpHeader {
        &self.header
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.header.frames.len()
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.header.width
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.header.height
    }

    #[must_use]
    pub fn frame_size(&self) -> usize {
        self.header.width as usize * self.header.height as usize
    }

    /// Palette indices of frame `index`, row by row.
    ///
    /// # Errors
    /// - [WestwoodError::FrameOutOfRange]: `index` is past the last frame
    /// - [WestwoodError::MissingReference]: a delta frame's base doesn't exist
    /// - [WestwoodError::ChainTooDeep]: the delta chain exceeds the depth limit
    /// - [WestwoodError::ControlError]: frame data failed to decode
    pub fn frame(&mut self, index: usize) -> WestwoodResult<&[u8]> {
        self.materialize(index)?;
        self.cache[index]
            .as_deref()
            .ok_or(WestwoodError::MissingReference(index))
    }

    /// Index of the frame stored at file offset `offset`
    fn frame_at(&self, offset: u32) -> Option<usize> {
        self.header
            .frames
            .iter()
            .position(|frame| frame.offset == offset)
    }

    fn frame_bytes(&self, entry: &FrameEntry, index: usize) -> WestwoodResult<&[u8]> {
        self.data
            .get(entry.offset as usize..)
            .ok_or(WestwoodError::MissingReference(index))
    }

    /// Frame the delta of frame `index` applies to, `None` for a standalone frame
    fn base_of(&self, index: usize) -> WestwoodResult<Option<usize>> {
        let entry = &self.header.frames[index];
        let base = match entry.format {
            FrameFormat::Lcw => None,
            FrameFormat::XorPrev => Some(
                index
                    .checked_sub(1)
                    .ok_or(WestwoodError::MissingReference(index))?,
            ),
            FrameFormat::XorLcw => Some(
                self.frame_at(u32::from(entry.ref_offset))
                    .ok_or(WestwoodError::MissingReference(index))?,
            ),
        };
        Ok(base)
    }

    /// Walks from `index` down to a cached or standalone frame, then decodes
    /// back up the chain, caching every frame on the way.
    fn materialize(&mut self, index: usize) -> WestwoodResult<()> {
        if index >= self.frame_count() {
            return Err(WestwoodError::FrameOutOfRange(index));
        }

        let mut chain = vec![index];
        let mut current = index;
        while self.cache[current].is_none() {
            let Some(base) = self.base_of(current)? else {
                break;
            };
            if self.cache[base].is_none() && chain.len() > self.depth_limit {
                return Err(WestwoodError::ChainTooDeep(base));
            }
            trace!("frame {current} is a delta over frame {base}");
            chain.push(base);
            current = base;
        }

        for link in (0..chain.len()).rev() {
            let frame = chain[link];
            if self.cache[frame].is_some() {
                continue;
            }
            let entry = self.header.frames[frame];
            let pixels = match chain.get(link + 1) {
                None => decode(
                    self.frame_bytes(&entry, frame)?,
                    self.frame_size(),
                    DecodeOptions::default(),
                )?,
                Some(&base) => {
                    let mut pixels = self.cache[base]
                        .clone()
                        .ok_or(WestwoodError::MissingReference(frame))?;
                    apply_xor(self.frame_bytes(&entry, frame)?, &mut pixels)?;
                    pixels
                }
            };
            self.cache[frame] = Some(pixels);
        }
        Ok(())
    }
}
