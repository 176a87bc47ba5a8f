////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! Audio carried in `SND0` (raw PCM) and `SND2` (IMA ADPCM) chunks.
//!
//! Stereo chunks hold the left channel in their first half and the right
//! channel in their second half. Channels are decoded separately and
//! interleaved one 16 bit sample at a time.

use byteorder::{ByteOrder, LittleEndian};

/// Decoder for one channel of compressed audio
pub trait AudioCodec {
    /// Decodes a full channel into 16 bit Little Endian PCM.
    fn decode(&self, data: &[u8]) -> Vec<u8>;
}

const INDEX_ADJUST: [i32; 8] = [-1, -1, -1, -1, 2, 4, 6, 8];

const STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408,
    449, 494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630,
    9493, 10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794,
    32767,
];

/// IMA ADPCM, 4 bits per sample, low nibble first. Every channel starts with
/// a zero sample and step index.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImaAdpcm;

#[derive(Debug, Default)]
struct ImaState {
    sample: i32,
    index: usize,
}

impl ImaState {
    fn next(&mut self, nibble: u8) -> i16 {
        let step = STEP_TABLE[self.index];
        let magnitude = i32::from(nibble & 7);
        let mut delta = step * magnitude / 4 + step / 8;
        if nibble & 8 != 0 {
            delta = -delta;
        }

        self.sample = (self.sample + delta).clamp(i32::from(i16::MIN), i32::from(i16::MAX));
        self.index = (self.index as i32 + INDEX_ADJUST[magnitude as usize]).clamp(0, 88) as usize;
        self.sample as i16
    }
}

impl AudioCodec for ImaAdpcm {
    fn decode(&self, data: &[u8]) -> Vec<u8> {
        let mut state = ImaState::default();
        let mut out = vec![0; data.len() * 4];
        for (byte, samples) in data.iter().zip(out.chunks_exact_mut(4)) {
            LittleEndian::write_i16(&mut samples[..2], state.next(byte & 0x0F));
            LittleEndian::write_i16(&mut samples[2..], state.next(byte >> 4));
        }
        out
    }
}

/// Gathers the audio chunks of a whole video
#[derive(Debug, Default)]
pub(crate) struct AudioCollector {
    stereo: bool,
    compressed: bool,
    left: Vec<u8>,
    right: Vec<u8>,
}

impl AudioCollector {
    pub(crate) fn new(channels: u8) -> Self {
        Self {
            stereo: channels == 2,
            ..Default::default()
        }
    }

    /// Adds a chunk. A stereo chunk of odd length loses its last byte.
    pub(crate) fn push(&mut self, chunk: &[u8], compressed: bool) {
        self.compressed |= compressed;
        if self.stereo {
            let half = chunk.len() / 2;
            self.left.extend_from_slice(&chunk[..half]);
            self.right.extend_from_slice(&chunk[half..half * 2]);
        } else {
            self.left.extend_from_slice(chunk);
        }
    }

    /// PCM for the whole video, channels interleaved
    pub(crate) fn finish(self, codec: &impl AudioCodec) -> Vec<u8> {
        let (left, right) = if self.compressed {
            (codec.decode(&self.left), codec.decode(&self.right))
        } else {
            (self.left, self.right)
        };
        if !self.stereo {
            return left;
        }

        left.chunks_exact(2)
            .zip(right.chunks_exact(2))
            .flat_map(|(l, r)| [l[0], l[1], r[0], r[1]])
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn samples(pcm: &[u8]) -> Vec<i16> {
        pcm.chunks_exact(2).map(LittleEndian::read_i16).collect()
    }

    #[test]
    fn ima_first_samples() {
        // nibble 4 then 0: 7*4/4 + 7/8 = 7, index 2; then 9/8 = 1
        let pcm = ImaAdpcm.decode(&[0x04]);
        assert_eq!(samples(&pcm), [7, 8]);
    }

    #[test]
    fn ima_sign_bit_negates() {
        let pcm = ImaAdpcm.decode(&[0x0C]);
        assert_eq!(samples(&pcm), [-7, -6]);
    }

    #[test]
    fn ima_clamps_sample_and_index() {
        let pcm = ImaAdpcm.decode(&[0x77; 200]);
        let decoded = samples(&pcm);
        assert_eq!(decoded.len(), 400);
        assert_eq!(*decoded.last().unwrap(), i16::MAX);
    }

    #[test]
    fn mono_raw_passes_through() {
        let mut collector = AudioCollector::new(1);
        collector.push(&[1, 2, 3], false);
        collector.push(&[4], false);
        assert_eq!(collector.finish(&ImaAdpcm), [1, 2, 3, 4]);
    }

    #[test]
    fn stereo_raw_is_interleaved_per_sample() {
        let mut collector = AudioCollector::new(2);
        collector.push(&[1, 2, 3, 4, 5, 6, 7, 8], false);
        collector.push(&[9, 10, 11, 12, 0xEE], false);
        assert_eq!(
            collector.finish(&ImaAdpcm),
            [1, 2, 5, 6, 3, 4, 7, 8, 9, 10, 11, 12]
        );
    }

    #[test]
    fn any_compressed_chunk_decodes_everything() {
        let mut collector = AudioCollector::new(1);
        collector.push(&[0x00], false);
        collector.push(&[0x04], true);
        assert_eq!(collector.finish(&ImaAdpcm).len(), 8);
    }

    struct Doubler;

    impl AudioCodec for Doubler {
        fn decode(&self, data: &[u8]) -> Vec<u8> {
            data.iter().flat_map(|&b| [b, b]).collect()
        }
    }

    #[test]
    fn stereo_uses_supplied_codec_per_channel() {
        let mut collector = AudioCollector::new(2);
        collector.push(&[1, 2], true);
        assert_eq!(collector.finish(&Doubler), [1, 1, 2, 2]);
    }
}
