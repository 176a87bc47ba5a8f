////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! VQA video files.
//!
//! A VQA file is a `FORM` container holding the `VQHD` header, a table of
//! frame offsets (`FINF`) and then the frames. Every frame is a run of chunks
//! up to the next frame's offset: audio (`SND0`, `SND2`), jump records
//! (`SN2J`) and a frame group (`VQFR`, `VQFL`) whose sub-chunks update the
//! palette (`CPL0`) and codebook (`CBF0`, `CBFZ`, `CBP0`, `CBPZ`) and end with
//! the vector data of the frame (`VPTZ`, `VPRZ`, `VPTR`).
//!
//! Frames depend on every frame before them, because codebook and palette
//! updates carry over. [VqaReader] therefore replays frames in order; going
//! back means starting over from frame 0.
//!
//! # Example
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use westwood::vqa::VqaReader;
//!
//! let file = BufReader::new(File::open("intro.vqa")?);
//! let mut video = VqaReader::open(file)?;
//! while !video.is_exhausted() {
//!     let plane = video.frame_data()?;
//!     println!("{} pixels", plane.pixels().len());
//!     video.advance_frame()?;
//! }
//! # Ok::<(), westwood::WestwoodError>(())
//! ```

use std::io::{Read, Seek, SeekFrom};

use log::{debug, trace};

use crate::lcw::{decode_into, DecodeOptions, OffsetMode, OverrunPolicy};
use crate::vqa::audio::{AudioCodec, AudioCollector, ImaAdpcm};
use crate::vqa::blocks::{
    decode_classic,
    decode_high_colour,
    Palette,
    PixelPlane,
    CODEBOOK_ENTRY_STRIDE,
};
use crate::vqa::chunk::{
    skip_padding,
    ChunkHeader,
    TagDisplay,
    CBF0,
    CBFZ,
    CBP0,
    CBPZ,
    CPL0,
    SN2J,
    SND0,
    SND2,
    VPRZ,
    VPTR,
    VPTZ,
    VQFL,
    VQFR,
};
use crate::vqa::codebook::FrameAccumulator;
use crate::vqa::header::{read_preamble, VqaHeader};
use crate::{WestwoodError, WestwoodResult};

pub mod audio;
pub mod blocks;
pub mod chunk;
pub mod codebook;
pub mod header;

/// Size of the buffers for compressed codebooks and vector data of high
/// colour videos. The header field for it is unreliable.
pub const HIGH_COLOUR_BUFFER: usize = 256_000;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ReaderOptions {
    /// Applied to every LCW stream in the file. Defaults to
    /// [OverrunPolicy::Lenient] since shipped videos contain streams that
    /// overrun their buffers.
    pub overrun: OverrunPolicy,
    /// Pad the pixel plane to a power of two square instead of the exact
    /// frame size
    pub frame_padding: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            overrun: OverrunPolicy::Lenient,
            frame_padding: true,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ReaderState {
    /// Nothing applied yet. Frame 0 is loaded on first access.
    Initial,
    /// All chunks up to and including this frame are applied
    FrameLoaded(usize),
    /// Advanced past the last frame
    Exhausted,
}

/// What to do after a sub-chunk of a frame group
enum Flow {
    Continue,
    Done,
}

pub struct VqaReader<R> {
    stream: R,
    stream_length: u64,
    header: VqaHeader,
    offsets: Vec<u64>,
    options: ReaderOptions,
    accumulator: FrameAccumulator,
    palette: Palette,
    vectors: Vec<u8>,
    vector_len: usize,
    plane: PixelPlane,
    state: ReaderState,
    decoded: Option<usize>,
    audio: Vec<u8>,
}

impl<R: Read + Seek> VqaReader<R> {
    /// Opens a video with the default options and IMA ADPCM audio.
    ///
    /// # Errors
    /// See [VqaReader::open_with]
    pub fn open(stream: R) -> WestwoodResult<Self> {
        Self::open_with(stream, ReaderOptions::default(), &ImaAdpcm)
    }

    /// Reads the header and frame table and decodes the audio of the whole
    /// video. No frame is decoded yet.
    ///
    /// # Errors
    /// - [WestwoodError::BadMagic], [WestwoodError::InvalidHeader],
    ///   [WestwoodError::UnknownChunk]: the preamble is broken, see
    ///   [read_preamble]
    /// - [WestwoodError::TruncatedChunk]: a chunk runs past the end of the file
    /// - [WestwoodError::Io]: generic IO error while reading
    pub fn open_with(
        mut stream: R,
        options: ReaderOptions,
        codec: &impl AudioCodec,
    ) -> WestwoodResult<Self> {
        let stream_length = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(0))?;
        let (header, offsets) = read_preamble(&mut stream)?;

        let width = header.width as usize;
        let height = header.height as usize;
        let geometry = header.geometry();
        let (codebook_capacity, vector_capacity) = if header.is_high_colour() {
            (HIGH_COLOUR_BUFFER * 3, HIGH_COLOUR_BUFFER)
        } else {
            let addressable = 65_536 * CODEBOOK_ENTRY_STRIDE + geometry.block_pixels();
            (addressable.max(width * height), geometry.block_count() * 2)
        };

        let plane = if options.frame_padding {
            PixelPlane::padded(width, height)
        } else {
            PixelPlane::new(width, height)
        };

        let mut reader = Self {
            stream,
            stream_length,
            accumulator: FrameAccumulator::new(
                header.codebook_parts,
                codebook_capacity,
                options.overrun,
            ),
            header,
            offsets,
            options,
            palette: Palette::default(),
            vectors: vec![0; vector_capacity],
            vector_len: 0,
            plane,
            state: ReaderState::Initial,
            decoded: None,
            audio: vec![],
        };
        reader.audio = reader.collect_audio(codec)?;
        debug!("collected {} bytes of audio", reader.audio.len());

        Ok(reader)
    }

    #[must_use]
    pub fn header(&self) -> &VqaHeader {
        &self.header
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.offsets.len()
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
    pub fn framerate(&self) -> u8 {
        self.header.framerate
    }

    #[must_use]
    pub fn state(&self) -> ReaderState {
        self.state
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == ReaderState::Exhausted
    }

    /// Index of the frame [VqaReader::frame_data] returns. Equal to the frame
    /// count once exhausted.
    #[must_use]
    pub fn current_frame(&self) -> usize {
        match self.state {
            ReaderState::Initial => 0,
            ReaderState::FrameLoaded(frame) => frame,
            ReaderState::Exhausted => self.frame_count(),
        }
    }

    /// PCM audio of the whole video, channels interleaved. Empty for silent
    /// videos.
    #[must_use]
    pub fn audio_data(&self) -> &[u8] {
        &self.audio
    }

    #[must_use]
    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }

    /// Goes back to before frame 0, dropping the codebook and palette.
    pub fn reset(&mut self) {
        self.accumulator.reset();
        self.palette = Palette::default();
        self.vectors.fill(0);
        self.vector_len = 0;
        self.plane.clear();
        self.decoded = None;
        self.state = ReaderState::Initial;
    }

    /// Moves to the next frame. Advancing past the last frame exhausts the
    /// reader; advancing an exhausted reader does nothing. On error the
    /// reader is reset to [ReaderState::Initial].
    ///
    /// # Errors
    /// See [VqaReader::load_frame]
    pub fn advance_frame(&mut self) -> WestwoodResult<()> {
        let next = match self.state {
            ReaderState::Initial => {
                if self.frame_count() == 0 {
                    self.state = ReaderState::Exhausted;
                    return Ok(());
                }
                self.apply_or_rewind(0)?;
                1
            }
            ReaderState::FrameLoaded(frame) => frame + 1,
            ReaderState::Exhausted => return Ok(()),
        };

        if next >= self.frame_count() {
            self.state = ReaderState::Exhausted;
        } else {
            self.apply_or_rewind(next)?;
            self.state = ReaderState::FrameLoaded(next);
        }
        Ok(())
    }

    /// Applies the chunks of every frame up to `frame`. Moving backwards
    /// starts over from frame 0, as does any error.
    ///
    /// # Errors
    /// - [WestwoodError::FrameOutOfRange]: `frame` is past the last frame
    /// - [WestwoodError::UnknownChunk]: a frame group holds an unknown chunk
    /// - [WestwoodError::TruncatedChunk]: a chunk runs past the end of the file
    /// - [WestwoodError::ControlError]: an LCW stream failed to decode
    /// - [WestwoodError::Io]: generic IO error while reading
    pub fn load_frame(&mut self, frame: usize) -> WestwoodResult<()> {
        if frame >= self.frame_count() {
            return Err(WestwoodError::FrameOutOfRange(frame));
        }

        let first = match self.state {
            ReaderState::FrameLoaded(current) if current == frame => return Ok(()),
            ReaderState::FrameLoaded(current) if current < frame => current + 1,
            _ => {
                self.reset();
                0
            }
        };

        for index in first..=frame {
            self.apply_or_rewind(index)?;
        }
        self.state = ReaderState::FrameLoaded(frame);
        Ok(())
    }

    /// Pixels of the current frame as `0xAARRGGBB`. Decoding only happens
    /// when the frame changed since the last call.
    ///
    /// # Errors
    /// - [WestwoodError::FrameOutOfRange]: the reader is exhausted
    /// - [WestwoodError::BadVector]: the vector data of the frame is broken
    /// - See [VqaReader::load_frame] for loading frame 0 on first access
    pub fn frame_data(&mut self) -> WestwoodResult<&PixelPlane> {
        let frame = match self.state {
            ReaderState::Initial => {
                self.load_frame(0)?;
                0
            }
            ReaderState::FrameLoaded(frame) => frame,
            ReaderState::Exhausted => {
                return Err(WestwoodError::FrameOutOfRange(self.frame_count()))
            }
        };

        if self.decoded != Some(frame) {
            let geometry = self.header.geometry();
            if self.header.is_high_colour() {
                decode_high_colour(
                    &self.vectors[..self.vector_len],
                    self.accumulator.codebook(),
                    geometry,
                    &mut self.plane,
                )?;
            } else {
                decode_classic(
                    &self.vectors,
                    self.accumulator.codebook(),
                    &self.palette,
                    geometry,
                    &mut self.plane,
                )?;
            }
            self.decoded = Some(frame);
        }

        Ok(&self.plane)
    }

    fn frame_end(&self, frame: usize) -> u64 {
        self.offsets.get(frame + 1).copied().unwrap_or(self.stream_length)
    }

    fn read_payload(&mut self, chunk: ChunkHeader) -> WestwoodResult<Vec<u8>> {
        let position = self.stream.stream_position()?;
        if position + u64::from(chunk.length) > self.stream_length {
            return Err(WestwoodError::TruncatedChunk(chunk.tag));
        }
        let mut payload = vec![0; chunk.length as usize];
        self.stream.read_exact(&mut payload)?;
        Ok(payload)
    }

    fn skip_payload(&mut self, chunk: ChunkHeader) -> WestwoodResult<()> {
        let position = self.stream.stream_position()?;
        if position + u64::from(chunk.length) > self.stream_length {
            return Err(WestwoodError::TruncatedChunk(chunk.tag));
        }
        self.stream.seek(SeekFrom::Current(i64::from(chunk.length)))?;
        Ok(())
    }

    fn collect_audio(&mut self, codec: &impl AudioCodec) -> WestwoodResult<Vec<u8>> {
        let mut collector = AudioCollector::new(self.header.channels);

        for frame in 0..self.frame_count() {
            let end = self.frame_end(frame);
            self.stream.seek(SeekFrom::Start(self.offsets[frame]))?;

            while self.stream.stream_position()? < end {
                let chunk = ChunkHeader::read(&mut self.stream)?;
                match chunk.tag {
                    SND0 | SND2 => {
                        if self.header.channels == 0 {
                            return Err(WestwoodError::InvalidHeader(
                                "audio chunk in a video without audio channels",
                            ));
                        }
                        let payload = self.read_payload(chunk)?;
                        collector.push(&payload, chunk.tag == SND2);
                    }
                    _ => self.skip_payload(chunk)?,
                }
                skip_padding(&mut self.stream)?;
            }
        }

        Ok(collector.finish(codec))
    }

    /// A frame that fails halfway leaves the palette and codebook in no
    /// frame's state, so the reader starts over from frame 0.
    fn apply_or_rewind(&mut self, frame: usize) -> WestwoodResult<()> {
        let result = self.apply_frame(frame);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn apply_frame(&mut self, frame: usize) -> WestwoodResult<()> {
        let end = self.frame_end(frame);
        self.stream.seek(SeekFrom::Start(self.offsets[frame]))?;
        trace!("applying frame {frame}");

        while self.stream.stream_position()? < end {
            let chunk = ChunkHeader::read(&mut self.stream)?;
            trace!("frame {frame}: chunk {}", TagDisplay(chunk.tag));
            match chunk.tag {
                VQFR => self.apply_group(chunk, false)?,
                VQFL => self.apply_group(chunk, true)?,
                CPL0 | CBF0 | CBFZ | CBP0 | CBPZ | VPTZ | VPRZ | VPTR => {
                    self.apply_sub_chunk(chunk)?;
                }
                // audio is collected up front, jump records carry nothing
                _ => self.skip_payload(chunk)?,
            }
            skip_padding(&mut self.stream)?;
        }
        Ok(())
    }

    /// Applies sub-chunks until the group's terminal chunk. `VQFL` groups end
    /// after their compressed codebook. Bytes after the terminal chunk are
    /// skipped.
    fn apply_group(&mut self, group: ChunkHeader, codebook_only: bool) -> WestwoodResult<()> {
        self.accumulator.commit_if_complete()?;
        let end = self.stream.stream_position()? + u64::from(group.length);

        while self.stream.stream_position()? < end {
            skip_padding(&mut self.stream)?;
            let chunk = ChunkHeader::read(&mut self.stream)?;
            trace!("  sub-chunk {}", TagDisplay(chunk.tag));
            let flow = self.apply_sub_chunk(chunk)?;
            if matches!(flow, Flow::Done) || (codebook_only && chunk.tag == CBFZ) {
                break;
            }
        }

        // whatever follows the terminal chunk belongs to the group
        if self.stream.stream_position()? < end {
            self.stream.seek(SeekFrom::Start(end))?;
        }
        Ok(())
    }

    fn apply_sub_chunk(&mut self, chunk: ChunkHeader) -> WestwoodResult<Flow> {
        match chunk.tag {
            CPL0 => {
                let payload = self.read_payload(chunk)?;
                self.palette.load(&payload, self.header.num_colors as usize);
            }
            CBF0 => {
                let payload = self.read_payload(chunk)?;
                self.accumulator.replace(&payload);
            }
            CBFZ => {
                let payload = self.read_payload(chunk)?;
                self.replace_compressed_codebook(&payload)?;
            }
            CBP0 | CBPZ => {
                let payload = self.read_payload(chunk)?;
                self.accumulator.append_fragment(&payload, chunk.tag == CBPZ)?;
            }
            VPTZ => {
                let payload = self.read_payload(chunk)?;
                self.vectors.fill(0);
                let options = self.decode_options(OffsetMode::Absolute);
                self.vector_len = decode_into(&payload, &mut self.vectors, options)?;
                return Ok(Flow::Done);
            }
            VPRZ => {
                let payload = self.read_payload(chunk)?;
                self.vectors.fill(0);
                let (stream, offsets) = split_offset_mode(&payload);
                let options = self.decode_options(offsets);
                self.vector_len = decode_into(stream, &mut self.vectors, options)?;
                return Ok(Flow::Done);
            }
            VPTR => {
                let payload = self.read_payload(chunk)?;
                if payload.len() > self.vectors.len() {
                    self.vectors.resize(payload.len(), 0);
                }
                self.vectors.fill(0);
                self.vectors[..payload.len()].copy_from_slice(&payload);
                self.vector_len = payload.len();
                return Ok(Flow::Done);
            }
            SN2J | SND0 | SND2 => self.skip_payload(chunk)?,
            tag => return Err(WestwoodError::UnknownChunk(tag)),
        }
        Ok(Flow::Continue)
    }

    fn replace_compressed_codebook(&mut self, payload: &[u8]) -> WestwoodResult<()> {
        let capacity = if self.header.is_high_colour() {
            HIGH_COLOUR_BUFFER
        } else {
            self.accumulator.codebook().len()
        };
        let mut unpacked = vec![0; capacity];
        let (stream, offsets) = split_offset_mode(payload);
        let written = decode_into(stream, &mut unpacked, self.decode_options(offsets))?;

        if self.header.is_high_colour() {
            self.accumulator.replace(&unpack_high_colour(&unpacked[..written]));
        } else {
            self.accumulator.replace(&unpacked[..written]);
        }
        Ok(())
    }

    fn decode_options(&self, offsets: OffsetMode) -> DecodeOptions {
        DecodeOptions {
            overrun: self.options.overrun,
            offsets,
        }
    }
}

/// Streams starting with `0x00` use relative offsets. The marker byte is not
/// part of the stream.
fn split_offset_mode(payload: &[u8]) -> (&[u8], OffsetMode) {
    match payload.split_first() {
        Some((&0, rest)) => (rest, OffsetMode::Relative),
        _ => (payload, OffsetMode::Absolute),
    }
}

/// Expands `0rrrrrgg gggbbbbb` Little Endian words to R G B bytes
fn unpack_high_colour(packed: &[u8]) -> Vec<u8> {
    packed
        .chunks_exact(2)
        .flat_map(|word| {
            let value = u16::from(word[0]) | u16::from(word[1]) << 8;
            [
                ((value & 0x7C00) >> 7) as u8,
                ((value & 0x03E0) >> 2) as u8,
                ((value & 0x001F) << 3) as u8,
            ]
        })
        .collect()
}
