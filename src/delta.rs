////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! XOR delta patches (also known as "Format40"), used by sprite frames that
//! are stored as a difference against an earlier frame.
//!
//! A patch is applied in place: every byte it touches is XORed with a value
//! from the patch, everything it skips keeps the value of the base frame.
//!
//! ## Commands
//!
//! | Command    | Layout                               | Effect                          |
//! |------------|--------------------------------------|---------------------------------|
//! | Fill       | `0000-0000:count:value`              | XOR `count` bytes with `value`  |
//! | Literal    | `0CCC-CCCC` + C bytes                | XOR with the following bytes    |
//! | Skip       | `1CCC-CCCC`                          | skip C bytes                    |
//! | Stop       | `1000-0000:0000-0000:0000-0000`      | end of patch                    |
//! | Long skip  | `1000-0000:0CCC-CCCC:CCCC-CCCC` (LE) | skip C bytes                    |
//! | Long XOR   | `1000-0000:10CC-CCCC:CCCC-CCCC` (LE) | XOR with the following C bytes  |
//! | Long fill  | `1000-0000:11CC-CCCC:CCCC-CCCC:value`| XOR C bytes with `value`        |

use crate::lcw::{check_capacity, CompressedBlob, DecodeError};
use crate::{WestwoodError, WestwoodResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaCommand {
    Fill { length: usize, value: u8 },
    Literal(usize),
    Skip(usize),
    Stop,
}

impl DeltaCommand {
    /// Reads a command from the stream. Literal bytes and fill values of long
    /// commands are read as part of the command.
    pub(crate) fn read(blob: &mut CompressedBlob) -> Result<Self, DecodeError> {
        let first = blob.read_u8()?;
        let count = (first & 0x7F) as usize;

        let command = match (first & 0x80 != 0, count) {
            (false, 0) => {
                let length = blob.read_u8()? as usize;
                let value = blob.read_u8()?;
                Self::Fill { length, value }
            }
            (false, _) => Self::Literal(count),
            (true, 0) => {
                let word = blob.read_u16()?;
                let length = (word & 0x3FFF) as usize;
                if word == 0 {
                    Self::Stop
                } else if word & 0x8000 == 0 {
                    Self::Skip(word as usize)
                } else if word & 0x4000 == 0 {
                    Self::Literal(length)
                } else {
                    Self::Fill {
                        length,
                        value: blob.read_u8()?,
                    }
                }
            }
            (true, _) => Self::Skip(count),
        };

        Ok(command)
    }
}

fn apply(
    command: DeltaCommand,
    blob: &mut CompressedBlob,
    buffer: &mut [u8],
    position: usize,
) -> Result<usize, DecodeError> {
    match command {
        DeltaCommand::Fill { length, value } => {
            check_capacity(buffer, position, length)?;
            for byte in &mut buffer[position..position + length] {
                *byte ^= value;
            }
            Ok(position + length)
        }
        DeltaCommand::Literal(length) => {
            let bytes = blob.read_slice(length)?;
            check_capacity(buffer, position, length)?;
            for (byte, patch) in buffer[position..position + length].iter_mut().zip(bytes) {
                *byte ^= patch;
            }
            Ok(position + length)
        }
        DeltaCommand::Skip(length) => {
            check_capacity(buffer, position, length)?;
            Ok(position + length)
        }
        DeltaCommand::Stop => Ok(position),
    }
}

/// Applies an XOR delta patch to `dst` in place.
///
/// # Returns
/// The position in `dst` the patch ended at
///
/// # Errors
/// - [WestwoodError::ControlError]: the patch ended without a stop command or
///   reaches past the end of `dst`
pub fn apply_xor(src: &[u8], dst: &mut [u8]) -> WestwoodResult<usize> {
    let mut blob = CompressedBlob::new(src);
    let mut position = 0;

    loop {
        let command_position = blob.position();
        let result = DeltaCommand::read(&mut blob).and_then(|command| {
            if command == DeltaCommand::Stop {
                Ok(None)
            } else {
                apply(command, &mut blob, dst, position).map(Some)
            }
        });

        match result {
            Ok(Some(new_position)) => position = new_position,
            Ok(None) => return Ok(position),
            Err(error) => {
                return Err(WestwoodError::ControlError {
                    error,
                    position: command_position,
                })
            }
        }
    }
}
