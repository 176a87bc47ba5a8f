////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! The live codebook of a video and the partial updates building the next
//! one.
//!
//! Videos may replace the codebook whole (`CBF0`, `CBFZ`) or spread the next
//! codebook over several frames as fragments (`CBP0`, `CBPZ`). Fragments are
//! concatenated until the header's part count is reached. The complete batch
//! only becomes live once the next fragment arrives or the next frame group
//! starts, never in the frame that delivered the last part.

use log::trace;

use crate::lcw::{decode_into, DecodeOptions, OverrunPolicy};
use crate::WestwoodResult;

#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    parts: usize,
    fragments: usize,
    pending: Vec<u8>,
    pending_compressed: bool,
    codebook: Vec<u8>,
    overrun: OverrunPolicy,
}

impl FrameAccumulator {
    /// `capacity` is the minimum codebook size. The codebook is zero filled to
    /// it so that every lookup of a well formed frame lands inside it.
    #[must_use]
    pub fn new(parts: u8, capacity: usize, overrun: OverrunPolicy) -> Self {
        Self {
            parts: parts as usize,
            fragments: 0,
            pending: vec![],
            pending_compressed: false,
            codebook: vec![0; capacity],
            overrun,
        }
    }

    #[must_use]
    pub fn codebook(&self) -> &[u8] {
        &self.codebook
    }

    /// Fragments received since the last commit
    #[must_use]
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Makes the pending batch live if all of its parts have arrived.
    ///
    /// # Returns
    /// Whether a commit happened
    ///
    /// # Errors
    /// - [WestwoodError::ControlError](crate::WestwoodError::ControlError):
    ///   the batch was compressed and failed to decode
    pub fn commit_if_complete(&mut self) -> WestwoodResult<bool> {
        if self.parts == 0 || self.fragments != self.parts {
            return Ok(false);
        }

        if self.pending_compressed {
            let options = DecodeOptions {
                overrun: self.overrun,
                ..Default::default()
            };
            let written = decode_into(&self.pending, &mut self.codebook, options)?;
            trace!("committed {} compressed codebook bytes", written);
        } else {
            self.overwrite_prefix();
            trace!("committed {} codebook bytes", self.pending.len());
        }

        self.pending.clear();
        self.fragments = 0;
        Ok(true)
    }

    /// Adds a fragment to the pending batch, first committing a batch that
    /// is already complete. Fragments are dropped when the video declares
    /// zero parts.
    ///
    /// # Returns
    /// Whether a commit happened
    ///
    /// # Errors
    /// See [FrameAccumulator::commit_if_complete]
    pub fn append_fragment(&mut self, bytes: &[u8], is_compressed: bool) -> WestwoodResult<bool> {
        // a batch of zero parts never completes
        if self.parts == 0 {
            trace!("dropped a {} byte codebook fragment", bytes.len());
            return Ok(false);
        }
        let committed = self.commit_if_complete()?;
        self.pending.extend_from_slice(bytes);
        self.pending_compressed = is_compressed;
        self.fragments += 1;
        Ok(committed)
    }

    /// Replaces the live codebook with `bytes`, zeroing whatever they don't
    /// cover. Fragments received so far are dropped.
    pub fn replace(&mut self, bytes: &[u8]) {
        if bytes.len() > self.codebook.len() {
            self.codebook.resize(bytes.len(), 0);
        }
        self.codebook[..bytes.len()].copy_from_slice(bytes);
        self.codebook[bytes.len()..].fill(0);
        self.pending.clear();
        self.fragments = 0;
    }

    pub fn reset(&mut self) {
        self.codebook.fill(0);
        self.pending.clear();
        self.pending_compressed = false;
        self.fragments = 0;
    }

    fn overwrite_prefix(&mut self) {
        if self.pending.len() > self.codebook.len() {
            self.codebook.resize(self.pending.len(), 0);
        }
        self.codebook[..self.pending.len()].copy_from_slice(&self.pending);
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;
    use crate::lcw::{encode, CompressionOptions};

    #[proptest]
    fn commits_exactly_once_per_batch(#[strategy(1..=8u8)] parts: u8) {
        let mut accumulator = FrameAccumulator::new(parts, 64, OverrunPolicy::Strict);
        let mut commits = 0;
        for _ in 0..parts {
            if accumulator.append_fragment(&[1], false).unwrap() {
                commits += 1;
            }
        }
        prop_assert_eq!(commits, 0);

        if accumulator.append_fragment(&[2], false).unwrap() {
            commits += 1;
        }
        prop_assert_eq!(commits, 1);
        prop_assert_eq!(accumulator.fragments(), 1);
        prop_assert!(accumulator.codebook()[..parts as usize].iter().all(|&b| b == 1));
    }

    #[proptest]
    fn incomplete_batch_never_commits(#[strategy(2..=8u8)] parts: u8) {
        let mut accumulator = FrameAccumulator::new(parts, 64, OverrunPolicy::Strict);
        for _ in 0..parts - 1 {
            prop_assert!(!accumulator.append_fragment(&[1], false).unwrap());
        }
        prop_assert!(!accumulator.commit_if_complete().unwrap());
        prop_assert!(accumulator.codebook().iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_parts_never_commits() {
        let mut accumulator = FrameAccumulator::new(0, 4, OverrunPolicy::Strict);
        for _ in 0..4 {
            assert!(!accumulator.append_fragment(&[1], false).unwrap());
        }
        assert_eq!(accumulator.fragments(), 0);
        assert!(accumulator.pending.is_empty());
        assert_eq!(accumulator.codebook(), [0; 4]);
    }

    #[test]
    fn compressed_batch_is_decoded_on_commit() {
        let codebook: Vec<u8> = (0..32).collect();
        let compressed = encode(&codebook, CompressionOptions::Fast);
        let (first, second) = compressed.split_at(compressed.len() / 2);

        let mut accumulator = FrameAccumulator::new(2, 64, OverrunPolicy::Strict);
        accumulator.append_fragment(first, true).unwrap();
        accumulator.append_fragment(second, true).unwrap();
        assert!(accumulator.commit_if_complete().unwrap());
        assert_eq!(&accumulator.codebook()[..32], codebook.as_slice());
    }

    #[test]
    fn batch_compression_follows_last_fragment() {
        let mut accumulator = FrameAccumulator::new(2, 8, OverrunPolicy::Strict);
        // a stream of "fill 4 with 7" split over two fragments, the first
        // flagged raw
        accumulator.append_fragment(&[0xFE, 0x04], false).unwrap();
        accumulator.append_fragment(&[0x00, 0x07, 0x80], true).unwrap();
        assert!(accumulator.commit_if_complete().unwrap());
        assert_eq!(accumulator.codebook(), [7, 7, 7, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn replace_resets_fragments() {
        let mut accumulator = FrameAccumulator::new(2, 4, OverrunPolicy::Strict);
        accumulator.append_fragment(&[9, 9], false).unwrap();
        accumulator.replace(&[1, 2]);
        assert_eq!(accumulator.codebook(), [1, 2, 0, 0]);
        assert_eq!(accumulator.fragments(), 0);

        accumulator.append_fragment(&[3], false).unwrap();
        assert!(!accumulator.commit_if_complete().unwrap());
        accumulator.append_fragment(&[4], false).unwrap();
        assert!(accumulator.commit_if_complete().unwrap());
        assert_eq!(accumulator.codebook(), [3, 4, 0, 0]);
    }

    #[test]
    fn replace_grows_codebook() {
        let mut accumulator = FrameAccumulator::new(1, 2, OverrunPolicy::Strict);
        accumulator.replace(&[1, 2, 3]);
        assert_eq!(accumulator.codebook(), [1, 2, 3]);
    }
}
