////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! A crate for decoding the asset formats of 90s Westwood real time strategy
//! games.
//!
//! The base of everything is [lcw], the back-reference/run-length compression
//! also known as "Format80". It is headerless and always embedded in another
//! container which records the decompressed length.
//!
//! Built on it:
//! - [vqa]: the VQA vector quantized video container
//! - [shp]: the SHP sprite container, whose frames are either standalone or
//!   [delta] patches over an earlier frame
//!
//! # Example
//!
//! ```
//! use westwood::lcw::{self, CompressionOptions, DecodeOptions};
//!
//! let input = b"Hello Hello Hello World!";
//! let compressed = lcw::encode(input, CompressionOptions::Fast);
//! let decompressed = lcw::decode(&compressed, input.len(), DecodeOptions::default()).unwrap();
//! assert_eq!(&decompressed, input);
//! ```
//!
//! # Errors
//!
//! Nothing is retried or recovered internally: streams are deterministic and
//! every failure is returned as a [WestwoodError] for the caller to decide on.
//! The only exception is [OverrunPolicy::Lenient](lcw::OverrunPolicy::Lenient),
//! which truncates output that would overrun its destination because shipped
//! assets depend on it.

#![warn(clippy::pedantic, clippy::cargo)]
// Due to the high amount of byte conversions, sometimes intentional lossy conversions are necessary.
#![allow(clippy::cast_possible_truncation)]
// Default::default() is more idiomatic imo
#![allow(clippy::default_trait_access)]
// too many lines is a dumb metric
#![allow(clippy::too_many_lines)]

pub mod delta;
mod error;
pub mod lcw;
pub mod shp;
pub mod vqa;

pub use crate::error::{Error as WestwoodError, Result as WestwoodResult};
