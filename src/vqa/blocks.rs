////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! Turning vector data and a codebook into pixels.
//!
//! A frame is divided into blocks of `block_width` x `block_height` pixels.
//! Every block is drawn from an entry of the codebook, picked by the vector
//! data of the frame.
//!
//! ## Palette videos
//! The vector data is two planes of `blocks_x * blocks_y` bytes. The first
//! holds the low byte of the codebook entry, the second the high byte. A
//! high byte of `0x0F` marks a block flat filled with the palette colour of
//! the low byte.
//!
//! ## High colour videos
//! The vector data is a stream of 16 bit opcodes. The top 3 bits select the
//! operation:
//!
//! | Op | Effect                                                          |
//! |----|-----------------------------------------------------------------|
//! | 0  | skip `low13` blocks                                             |
//! | 1  | draw block `low8`, `(bits 8..13 + 1) * 2` times                 |
//! | 2  | draw block `low8`, then `(bits 8..13 + 1) * 2` blocks, one byte each |
//! | 3  | draw block `low13` once                                         |
//! | 5  | draw block `low13`, as many times as the next byte says         |
//!
//! Codebook entries of high colour videos are 3 bytes per pixel, R G B.

use crate::{WestwoodError, WestwoodResult};

/// Stride between codebook entries of palette videos
pub const CODEBOOK_ENTRY_STRIDE: usize = 8;

/// High byte marking a flat block
pub const FLAT_BLOCK: u8 = 0x0F;

pub const OPAQUE: u32 = 0xFF00_0000;

/// Up to 256 colours as `0xAARRGGBB`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Palette {
    colours: [u32; 256],
}

impl Default for Palette {
    fn default() -> Self {
        Self { colours: [0; 256] }
    }
}

impl Palette {
    #[must_use]
    pub fn from_colours(colours: &[u32]) -> Self {
        let mut palette = Self::default();
        for (slot, colour) in palette.colours.iter_mut().zip(colours) {
            *slot = *colour;
        }
        palette
    }

    /// Loads up to `count` 6 bit per channel RGB triplets. Entries past the
    /// data keep their previous colour.
    pub fn load(&mut self, bytes: &[u8], count: usize) {
        for (slot, rgb) in self.colours.iter_mut().zip(bytes.chunks_exact(3)).take(count) {
            let (r, g, b) = (u32::from(rgb[0] << 2), u32::from(rgb[1] << 2), u32::from(rgb[2] << 2));
            *slot = OPAQUE | r << 16 | g << 8 | b;
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: u8) -> u32 {
        self.colours[index as usize]
    }
}

/// Block layout of a frame
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockGeometry {
    pub block_width: usize,
    pub block_height: usize,
    pub blocks_x: usize,
    pub blocks_y: usize,
}

impl BlockGeometry {
    /// Partial blocks at the right and bottom edge are dropped.
    ///
    /// # Panics
    /// Panics if either block dimension is 0
    #[must_use]
    pub fn new(width: usize, height: usize, block_width: usize, block_height: usize) -> Self {
        Self {
            block_width,
            block_height,
            blocks_x: width / block_width,
            blocks_y: height / block_height,
        }
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks_x * self.blocks_y
    }

    #[must_use]
    pub fn block_pixels(&self) -> usize {
        self.block_width * self.block_height
    }
}

/// Decoded frame. Rows are `stride` pixels apart, which may be more than the
/// frame width.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PixelPlane {
    stride: usize,
    rows: usize,
    pixels: Vec<u32>,
}

impl PixelPlane {
    #[must_use]
    pub fn new(stride: usize, rows: usize) -> Self {
        Self {
            stride,
            rows,
            pixels: vec![0; stride * rows],
        }
    }

    /// Square plane with a power of two side covering `width` x `height`
    #[must_use]
    pub fn padded(width: usize, height: usize) -> Self {
        let side = width.max(height).next_power_of_two();
        Self::new(side, side)
    }

    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[must_use]
    pub fn row(&self, y: usize) -> &[u32] {
        &self.pixels[y * self.stride..(y + 1) * self.stride]
    }

    #[inline]
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.stride + x]
    }

    #[inline]
    fn set(&mut self, x: usize, y: usize, colour: u32) {
        self.pixels[y * self.stride + x] = colour;
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }
}

/// Draws a palette video frame.
///
/// # Errors
/// - [WestwoodError::BadVector]: the vector planes are shorter than the
///   frame, or a block addresses past the end of the codebook
pub fn decode_classic(
    vectors: &[u8],
    codebook: &[u8],
    palette: &Palette,
    geometry: BlockGeometry,
    plane: &mut PixelPlane,
) -> WestwoodResult<()> {
    let blocks = geometry.block_count();
    if vectors.len() < blocks * 2 {
        return Err(WestwoodError::BadVector(vectors.len()));
    }
    let (low, high) = vectors.split_at(blocks);
    let (bw, bh) = (geometry.block_width, geometry.block_height);

    for y in 0..geometry.blocks_y {
        for x in 0..geometry.blocks_x {
            let block = x + y * geometry.blocks_x;
            let (px, modifier) = (low[block], high[block]);
            let entry = (modifier as usize * 256 + px as usize) * CODEBOOK_ENTRY_STRIDE;

            for j in 0..bh {
                for i in 0..bw {
                    let colour = if modifier == FLAT_BLOCK {
                        palette.get(px)
                    } else {
                        let index = entry + j * bw + i;
                        let colour_index = *codebook
                            .get(index)
                            .ok_or(WestwoodError::BadVector(block))?;
                        palette.get(colour_index)
                    };
                    plane.set(x * bw + i, y * bh + j, colour);
                }
            }
        }
    }

    Ok(())
}

/// Cursor over the blocks of a frame in row order
struct BlockWriter<'a> {
    codebook: &'a [u8],
    geometry: BlockGeometry,
    plane: &'a mut PixelPlane,
    x: usize,
    y: usize,
}

impl BlockWriter<'_> {
    /// Draws codebook entry `block` `count` times, moving to the next row
    /// when one is full. Every repetition must land inside the frame.
    fn write_block(&mut self, block: usize, count: usize, position: usize) -> WestwoodResult<()> {
        let (bw, bh) = (self.geometry.block_width, self.geometry.block_height);
        let offset = block * bw * bh * 3;
        let entry = self
            .codebook
            .get(offset..offset + bw * bh * 3)
            .ok_or(WestwoodError::BadVector(position))?;

        for _ in 0..count {
            if self.y >= self.geometry.blocks_y {
                return Err(WestwoodError::BadVector(position));
            }
            for by in 0..bh {
                for bx in 0..bw {
                    let p = (bx + by * bw) * 3;
                    let colour = OPAQUE
                        | u32::from(entry[p]) << 16
                        | u32::from(entry[p + 1]) << 8
                        | u32::from(entry[p + 2]);
                    self.plane.set(self.x * bw + bx, self.y * bh + by, colour);
                }
            }

            self.x += 1;
            if self.x >= self.geometry.blocks_x {
                self.x = 0;
                self.y += 1;
            }
        }
        Ok(())
    }
}

/// Draws a high colour video frame. All of `vectors` must be consumed.
///
/// # Errors
/// - [WestwoodError::BadVector]: an unknown opcode, a block outside the
///   frame or codebook, or a stream that doesn't end with the frame
pub fn decode_high_colour(
    vectors: &[u8],
    codebook: &[u8],
    geometry: BlockGeometry,
    plane: &mut PixelPlane,
) -> WestwoodResult<()> {
    let mut writer = BlockWriter {
        codebook,
        geometry,
        plane,
        x: 0,
        y: 0,
    };
    let mut p = 0;
    let byte_at = |p: usize| vectors.get(p).copied().ok_or(WestwoodError::BadVector(p));

    while writer.y < geometry.blocks_y {
        writer.x = 0;
        while writer.x < geometry.blocks_x && writer.y < geometry.blocks_y {
            let position = p;
            let value = u16::from(byte_at(p)?) | u16::from(byte_at(p + 1)?) << 8;
            p += 2;

            let a = (value & 0x1FFF) as usize;
            let b1 = (value & 0xFF) as usize;
            let b2 = (((value >> 8) & 0x1F) as usize + 1) * 2;

            match value >> 13 {
                0 => writer.x += a,
                1 => writer.write_block(b1, b2, position)?,
                2 => {
                    writer.write_block(b1, 1, position)?;
                    for _ in 0..b2 {
                        let block = byte_at(p)? as usize;
                        p += 1;
                        writer.write_block(block, 1, position)?;
                    }
                }
                3 => writer.write_block(a, 1, position)?,
                5 => {
                    let count = byte_at(p)? as usize;
                    p += 1;
                    writer.write_block(a, count, position)?;
                }
                _ => return Err(WestwoodError::BadVector(position)),
            }
        }
        writer.y += 1;
    }

    if p != vectors.len() {
        return Err(WestwoodError::BadVector(p));
    }
    Ok(())
}
