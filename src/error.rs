////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

use std::fmt::{Display, Formatter};

use crate::lcw::DecodeError;
use crate::vqa::chunk::{Tag, TagDisplay};

/// Possible errors returned by decoding and encoding functions
#[derive(Debug)]
pub enum Error {
    /// Error indicating that a container did not start with the magic it is
    /// identified by
    ///
    /// ### Fields
    /// - Tag: What was read instead of the magic
    BadMagic(Tag),
    /// Error indicating that a container header holds values the decoder can't
    /// work with, such as a zero block size
    InvalidHeader(&'static str),
    /// Error for a sub-chunk tag with no known meaning at the place it was
    /// found
    UnknownChunk(Tag),
    /// Error for a chunk whose declared length runs past the end of the file
    TruncatedChunk(Tag),
    /// Indicates that an invalid operation occurred while attempting to decode
    /// a compressed stream. This normally indicates invalid or corrupted data.
    ///
    /// See [DecodeError] for further details on types of errors that can occur.
    ControlError { error: DecodeError, position: usize },
    /// Error for a vector stream of a high colour video that addresses blocks
    /// outside of the frame or codebook
    ///
    /// ### Fields
    /// - usize: position in the vector stream
    BadVector(usize),
    /// Error for a frame index past the end of a container
    FrameOutOfRange(usize),
    /// Error for a delta frame whose base frame can't be found
    ///
    /// ### Fields
    /// - usize: frame that was being decoded
    MissingReference(usize),
    /// Error for a chain of delta frames deeper than the allowed limit, which
    /// normally means the chain loops back on itself
    ///
    /// ### Fields
    /// - usize: frame that was being decoded
    ChainTooDeep(usize),
    /// Generic IO Error wrapper for when a generic IO error of some sort occurs
    /// in relation to the readers and writers.
    Io(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BadMagic(magic) => {
                write!(f, "Invalid magic number at container header `{}`", TagDisplay(*magic))
            }
            Error::InvalidHeader(reason) => {
                write!(f, "Invalid container header: {reason}")
            }
            Error::UnknownChunk(tag) => {
                write!(f, "Unknown sub-chunk `{}`", TagDisplay(*tag))
            }
            Error::TruncatedChunk(tag) => {
                write!(f, "Chunk `{}` runs past the end of the file", TagDisplay(*tag))
            }
            Error::ControlError { position, error } => {
                write!(
                    f,
                    "Error occured while decoding control block at position `{position}`:\n{error}"
                )
            }
            Error::BadVector(position) => {
                write!(f, "Vector stream addresses a block outside the frame at position `{position}`")
            }
            Error::FrameOutOfRange(frame) => {
                write!(f, "Frame `{frame}` is past the end of the container")
            }
            Error::MissingReference(frame) => {
                write!(f, "Frame `{frame}` references a base frame that doesn't exist")
            }
            Error::ChainTooDeep(frame) => {
                write!(f, "Delta chain of frame `{frame}` exceeds the depth limit")
            }
            Error::Io(err) => {
                write!(f, "IO Error: {err}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Wrapper for Result specified to [WestwoodError](crate::WestwoodError)
pub type Result<T> = std::result::Result<T, Error>;
