////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

use std::io::Cursor;

use paste::paste;
use westwood::lcw::{decode, encode, CompressionOptions, DecodeOptions};
use westwood::vqa::chunk::{CBF0, CBFZ, CBP0, CPL0, SN2J, SND0, SND2, VPTR, VPTZ, VQFL, VQFR};
use westwood::vqa::audio::ImaAdpcm;
use westwood::vqa::header::HIGH_COLOUR_FLAG;
use westwood::vqa::{ReaderOptions, ReaderState, VqaReader};
use westwood::WestwoodError;
use CompressionOptions::{Fast, Fastest};

use crate::corpus::{chunk, container, corpus_input, group, header, palette};

#[path = "../testing_corpus/corpus.rs"]
mod corpus;

const BLACK: u32 = 0xFF00_0000;
const WHITE: u32 = 0xFFFC_FCFC;

fn test_corpus_symmetrical(name: &str, mode: CompressionOptions) {
    let input = corpus_input(name);
    let compressed = encode(&input, mode);
    let decompressed =
        decode(&compressed, input.len(), DecodeOptions::default()).expect("Failed to decode");
    assert!(
        decompressed == input,
        "Decompressed output didn't match pre-compression input"
    );
}

// Encoder output may change with any algorithmic change, so only bound the
// size instead of comparing against known output.
fn test_corpus_compresses(name: &str, mode: CompressionOptions) {
    let input = corpus_input(name);
    let compressed = encode(&input, mode);
    assert!(compressed.len() <= input.len() + input.len() / 63 + 2);
}

macro_rules! corpus_test_final {
    ($name:ident, $mode:ident) => {
        paste! {
            #[test]
            #[allow(nonstandard_style)]
            fn [<integration_ $name _ $mode _symmetrically_compresses>]() {
                test_corpus_symmetrical(stringify!($name), $mode);
            }

            #[test]
            #[allow(nonstandard_style)]
            fn [<integration_ $name _ $mode _compresses>]() {
                test_corpus_compresses(stringify!($name), $mode);
            }
        }
    };
}

macro_rules! corpus_test {
    ($name:ident) => {
        corpus_test_final!($name, Fastest);
        corpus_test_final!($name, Fast);
    };
}

corpus_test!(zeros);
corpus_test!(ramp);
corpus_test!(text);
corpus_test!(random);
corpus_test!(sparse);
corpus_test!(palette);

fn black_and_white() -> Vec<u8> {
    chunk(&CPL0, &palette(&[[0, 0, 0], [63, 63, 63]]))
}

fn vectors(planes: &[u8]) -> Vec<u8> {
    chunk(&VPTZ, &encode(planes, Fast))
}

fn open(file: Vec<u8>) -> VqaReader<Cursor<Vec<u8>>> {
    VqaReader::open(Cursor::new(file)).expect("Failed to open video")
}

#[test]
fn flat_block_frame_is_black() {
    let frame = group(
        &VQFR,
        &[black_and_white(), chunk(&CBF0, &[1; 8]), vectors(&[0, 0x0F])],
    );
    let file = container(&header(4, 4, (4, 4), 1), &[frame]);
    let mut video = open(file);

    assert_eq!(video.frame_count(), 1);
    assert_eq!(video.state(), ReaderState::Initial);
    let plane = video.frame_data().unwrap();
    assert_eq!((plane.stride(), plane.rows()), (4, 4));
    assert!(plane.pixels().iter().all(|&pixel| pixel == BLACK));
    assert_eq!(video.state(), ReaderState::FrameLoaded(0));
}

#[test]
fn codebook_block_frame() {
    let frame = group(
        &VQFR,
        &[black_and_white(), chunk(&CBF0, &[1; 8]), vectors(&[0, 0])],
    );
    let file = container(&header(4, 4, (4, 4), 1), &[frame]);
    let mut video = open(file);

    let plane = video.frame_data().unwrap();
    assert_eq!(plane.row(0), [WHITE; 4]);
    assert_eq!(plane.row(1), [WHITE; 4]);
    assert_eq!(plane.row(2), [BLACK; 4]);
    assert_eq!(plane.row(3), [BLACK; 4]);
}

#[test]
fn bare_sub_chunks_are_accepted() {
    let frame = [black_and_white(), chunk(&CBF0, &[1; 16]), vectors(&[0, 0])].concat();
    let file = container(&header(4, 4, (4, 4), 1), &[frame]);
    let mut video = open(file);
    assert!(video.frame_data().unwrap().pixels().iter().all(|&pixel| pixel == WHITE));
}

#[test]
fn padding_option_controls_plane_size() {
    let frame = group(&VQFR, &[black_and_white(), vectors(&[0; 8])]);
    let file = container(&header(8, 4, (4, 2), 1), &[frame]);

    let mut video = open(file.clone());
    let plane = video.frame_data().unwrap();
    assert_eq!((plane.stride(), plane.rows()), (8, 8));

    let options = ReaderOptions {
        frame_padding: false,
        ..Default::default()
    };
    let mut video = VqaReader::open_with(Cursor::new(file), options, &ImaAdpcm).unwrap();
    let plane = video.frame_data().unwrap();
    assert_eq!((plane.stride(), plane.rows()), (8, 4));
}

/// Three frames of a 4x4 video split its codebook over two fragments.
fn fragmented_codebook_video() -> Vec<u8> {
    let mut header = header(4, 4, (4, 4), 3);
    header.codebook_parts = 2;
    let frames = [
        group(
            &VQFR,
            &[black_and_white(), chunk(&CBP0, &[1; 8]), vectors(&[0, 0])],
        ),
        group(&VQFR, &[chunk(&CBP0, &[1; 8]), vectors(&[0, 0])]),
        group(&VQFR, &[vectors(&[0, 0])]),
    ];
    container(&header, &frames)
}

fn all(video: &mut VqaReader<Cursor<Vec<u8>>>, colour: u32) -> bool {
    video.frame_data().unwrap().pixels().iter().all(|&pixel| pixel == colour)
}

#[test]
fn fragments_apply_in_the_frame_after_the_last_part() {
    let mut video = open(fragmented_codebook_video());

    assert!(all(&mut video, BLACK));
    video.advance_frame().unwrap();
    assert_eq!(video.current_frame(), 1);
    assert!(all(&mut video, BLACK));
    video.advance_frame().unwrap();
    assert_eq!(video.current_frame(), 2);
    assert!(all(&mut video, WHITE));
}

#[test]
fn seeking_backwards_replays_from_the_start() {
    let mut video = open(fragmented_codebook_video());

    video.load_frame(2).unwrap();
    assert!(all(&mut video, WHITE));
    video.load_frame(0).unwrap();
    assert!(all(&mut video, BLACK));
    video.load_frame(2).unwrap();
    assert!(all(&mut video, WHITE));

    video.reset();
    assert_eq!(video.state(), ReaderState::Initial);
    assert_eq!(video.current_frame(), 0);
    assert!(all(&mut video, BLACK));
}

#[test]
fn advancing_past_the_end_exhausts() {
    let mut video = open(fragmented_codebook_video());
    for _ in 0..3 {
        video.advance_frame().unwrap();
    }
    assert!(video.is_exhausted());
    assert_eq!(video.current_frame(), 3);
    assert!(matches!(video.frame_data(), Err(WestwoodError::FrameOutOfRange(3))));

    video.advance_frame().unwrap();
    assert!(video.is_exhausted());
    assert!(matches!(video.load_frame(3), Err(WestwoodError::FrameOutOfRange(3))));
}

#[test]
fn unknown_sub_chunk_errors() {
    let frame = group(&VQFR, &[chunk(b"XXXX", &[]), vectors(&[0, 0x0F])]);
    let file = container(&header(4, 4, (4, 4), 1), &[frame]);
    let mut video = open(file);
    assert!(matches!(
        video.frame_data(),
        Err(WestwoodError::UnknownChunk(tag)) if &tag == b"XXXX"
    ));
}

#[test]
fn bytes_after_vectors_are_ignored() {
    let frame = group(
        &VQFR,
        &[
            black_and_white(),
            chunk(&CBF0, &[1; 8]),
            vectors(&[0, 0x0F]),
            vec![0xAA, 0xBB],
        ],
    );
    let mut video = open(container(&header(4, 4, (4, 4), 1), &[frame]));
    assert!(all(&mut video, BLACK));
}

#[test]
fn failed_frame_rewinds_to_the_start() {
    let frames = [
        group(&VQFR, &[black_and_white(), vectors(&[1, 0x0F])]),
        group(
            &VQFR,
            &[
                chunk(&CPL0, &palette(&[[0, 0, 0], [0, 0, 0]])),
                chunk(b"XXXX", &[]),
                vectors(&[1, 0x0F]),
            ],
        ),
    ];
    let mut video = open(container(&header(4, 4, (4, 4), 2), &frames));

    video.load_frame(0).unwrap();
    assert!(video.advance_frame().is_err());
    assert_eq!(video.state(), ReaderState::Initial);
    // frame 0 again, with its own palette
    assert!(all(&mut video, WHITE));
    assert_eq!(video.state(), ReaderState::FrameLoaded(0));
}

#[test]
fn leading_pad_byte_before_frame_group() {
    let mut frame = vec![0];
    frame.extend(group(&VQFR, &[black_and_white(), vectors(&[1, 0x0F])]));
    frame.push(0);
    let file = container(&header(4, 4, (4, 4), 1), &[frame]);
    let mut video = open(file);
    assert!(all(&mut video, WHITE));
}

#[test]
fn lenient_overrun_keeps_decoded_prefix() {
    // the vector stream fills both planes, then writes one byte past them
    let stream = [0x82, 1, 0x0F, 0x81, 0x07, 0x80];
    let frame = group(&VQFR, &[black_and_white(), chunk(&VPTZ, &stream)]);
    let file = container(&header(4, 4, (4, 4), 1), &[frame]);

    let mut video = open(file.clone());
    assert!(all(&mut video, WHITE));

    let options = ReaderOptions {
        overrun: westwood::lcw::OverrunPolicy::Strict,
        ..Default::default()
    };
    let mut video = VqaReader::open_with(Cursor::new(file), options, &ImaAdpcm).unwrap();
    assert!(matches!(video.frame_data(), Err(WestwoodError::ControlError { .. })));
}

#[test]
fn mono_audio_is_collected_up_front() {
    let mut header = header(4, 4, (4, 4), 2);
    header.channels = 1;
    header.sample_rate = 22_050;
    header.sample_bits = 16;
    let frames = [
        [
            chunk(&SND0, &[1, 2, 3]),
            group(&VQFR, &[black_and_white(), vectors(&[0, 0x0F])]),
        ]
        .concat(),
        [
            chunk(&SN2J, &[0; 6]),
            chunk(&SND0, &[4, 5]),
            group(&VQFR, &[vectors(&[0, 0x0F])]),
        ]
        .concat(),
    ];
    let video = open(container(&header, &frames));
    assert!(video.has_audio());
    assert_eq!(video.audio_data(), [1, 2, 3, 4, 5]);
}

#[test]
fn stereo_adpcm_is_decoded_and_interleaved() {
    let mut header = header(4, 4, (4, 4), 1);
    header.channels = 2;
    let frames = [[
        chunk(&SND2, &[0x04, 0x0C]),
        group(&VQFR, &[black_and_white(), vectors(&[0, 0x0F])]),
    ]
    .concat()];
    let video = open(container(&header, &frames));

    let samples: Vec<i16> = video
        .audio_data()
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(samples, [7, -7, 8, -6]);
}

#[test]
fn silent_video_has_no_audio() {
    let frame = group(&VQFR, &[black_and_white(), vectors(&[0, 0x0F])]);
    let video = open(container(&header(4, 4, (4, 4), 1), &[frame]));
    assert!(!video.has_audio());
}

#[test]
fn high_colour_video() {
    let mut header = header(4, 2, (2, 1), 1);
    header.flags = HIGH_COLOUR_FLAG;

    // red and blue entries of two pixels, relative offset marker, 8 literals
    let mut codebook = vec![0x00, 0x88];
    codebook.extend_from_slice(&[0x00, 0x7C, 0x00, 0x7C, 0x1F, 0x00, 0x1F, 0x00]);
    codebook.push(0x80);

    let frame = group(
        &VQFR,
        &[
            chunk(&CBFZ, &codebook),
            chunk(&VPTR, &[0x00, 0x20, 0x01, 0x60, 0x01, 0x00]),
        ],
    );
    let mut video = open(container(&header, &[frame]));
    let plane = video.frame_data().unwrap();
    assert_eq!((plane.stride(), plane.rows()), (4, 4));
    assert_eq!(plane.row(0), [0xFFF8_0000; 4]);
    assert_eq!(plane.row(1), [0xFF00_00F8, 0xFF00_00F8, 0, 0]);
}

#[test]
fn codebook_group_precedes_frame_group() {
    let mut header = header(4, 2, (2, 1), 1);
    header.flags = HIGH_COLOUR_FLAG;
    let codebook = [0x86, 0x00, 0x7C, 0x00, 0x7C, 0x00, 0x7C, 0x80];

    let frame = [
        group(&VQFL, &[chunk(&CBFZ, &codebook)]),
        // op 1: block 0 four times
        group(&VQFR, &[chunk(&VPTR, &[0x00, 0x21])]),
    ]
    .concat();
    let mut video = open(container(&header, &[frame]));
    let plane = video.frame_data().unwrap();
    assert_eq!(plane.row(0), [0xFFF8_0000; 4]);
    assert_eq!(plane.row(1), [0xFFF8_0000; 4]);
}

#[test]
fn broken_vector_stream_errors() {
    let mut header = header(4, 2, (2, 1), 1);
    header.flags = HIGH_COLOUR_FLAG;
    let codebook = [0x86, 0x00, 0x7C, 0x00, 0x7C, 0x00, 0x7C, 0x80];

    let frame = group(
        &VQFR,
        &[chunk(&CBFZ, &codebook), chunk(&VPTR, &[0x00, 0x26])],
    );
    let mut video = open(container(&header, &[frame]));
    // op 1: block 0 fourteen times is more than the frame holds
    assert!(matches!(video.frame_data(), Err(WestwoodError::BadVector(0))));
}
