////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! Synthetic corpus shared by the integration tests: named LCW inputs and a
//! builder for small VQA files.

#![allow(dead_code)]

use rand::prelude::*;
use westwood::vqa::chunk::{ChunkHeader, Tag};
use westwood::vqa::header::{preamble_length, write_preamble, VqaHeader};

pub const CORPUS_SEED: u64 = 0x5745_5354_574F_4F44;

pub const CORPUS_LIST: [&str; 6] = ["zeros", "ramp", "text", "random", "sparse", "palette"];

/// Deterministic input for a corpus name
///
/// # Panics
/// Panics on names missing from [CORPUS_LIST]
pub fn corpus_input(name: &str) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(CORPUS_SEED);
    match name {
        "zeros" => vec![0; 100_000],
        "ramp" => (0..=255).cycle().take(70_000).collect(),
        "text" => b"The quick brown fox jumps over the lazy dog. "
            .iter()
            .copied()
            .cycle()
            .take(50_000)
            .collect(),
        "random" => (0..50_000).map(|_| rng.gen()).collect(),
        "sparse" => (0..80_000)
            .map(|_| if rng.gen_ratio(1, 16) { rng.gen() } else { 0 })
            .collect(),
        // block indices of a palette video: long runs with occasional changes
        "palette" => {
            let mut out = vec![];
            while out.len() < 64_000 {
                let value = rng.gen_range(0..16u8);
                let run = rng.gen_range(1..300);
                out.extend(std::iter::repeat(value).take(run));
            }
            out
        }
        _ => panic!("no corpus input named {name}"),
    }
}

/// A chunk with its header and pad byte
pub fn chunk(tag: &Tag, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    ChunkHeader {
        tag: *tag,
        length: payload.len() as u32,
    }
    .write(&mut out)
    .unwrap();
    out.extend_from_slice(payload);
    if out.len() % 2 == 1 {
        out.push(0);
    }
    out
}

/// A frame group chunk holding `sub_chunks`
pub fn group(tag: &Tag, sub_chunks: &[Vec<u8>]) -> Vec<u8> {
    chunk(tag, &sub_chunks.concat())
}

/// 6 bit per channel palette payload
pub fn palette(colours: &[[u8; 3]]) -> Vec<u8> {
    colours.concat()
}

pub fn header(width: u16, height: u16, block: (u8, u8), frames: u16) -> VqaHeader {
    VqaHeader {
        version: 2,
        frame_count: frames,
        width,
        height,
        block_width: block.0,
        block_height: block.1,
        framerate: 15,
        codebook_parts: 8,
        num_colors: 256,
        ..Default::default()
    }
}

/// A whole VQA file. Every frame must have an even length.
pub fn container(header: &VqaHeader, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut offsets = vec![];
    let mut position = preamble_length(frames.len());
    for frame in frames {
        assert_eq!(frame.len() % 2, 0, "frames must keep chunks aligned");
        offsets.push(position);
        position += frame.len() as u64;
    }

    let mut out = vec![];
    let header = VqaHeader {
        frame_count: frames.len() as u16,
        ..*header
    };
    write_preamble(&mut out, &header, &offsets, position as u32 - 8).unwrap();
    for frame in frames {
        out.extend_from_slice(frame);
    }
    out
}
