////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! control codes utilized by compression and decompression

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::lcw::{CompressedBlob, DecodeError};
use crate::WestwoodResult;

/// minimum length for a short copy command
pub const SHORT_LENGTH_MIN: u16 = 3;

/// maximum length for a short copy command
pub const SHORT_LENGTH_MAX: u16 = 10;

/// maximum distance for a short copy command
pub const SHORT_DISTANCE_MAX: u16 = 0x0FFF;

/// maximum number of bytes in a literal command
pub const LITERAL_MAX: u8 = 0x3F;

/// minimum length for a medium copy command
pub const MEDIUM_LENGTH_MIN: u16 = 3;

/// maximum length for a medium copy command
///
/// Equivalent to `64`. The two highest length codes are taken by the fill and
/// long copy commands.
pub const MEDIUM_LENGTH_MAX: u16 = 0x3D + MEDIUM_LENGTH_MIN;

/// maximum length for long copy and fill commands
pub const LONG_LENGTH_MAX: u16 = u16::MAX;

/// Control byte of the fill command
pub const FILL_BYTE: u8 = 0xFE;

/// Control byte of the long copy command
pub const LONG_BYTE: u8 = 0xFF;

/// Control byte of the end of stream command
pub const STOP_BYTE: u8 = 0x80;

/// Possible control code classes, picked from the first byte of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    Short,
    Literal,
    Medium,
    Fill,
    Long,
    Stop,
}

/// Maps the first byte of a command to its class.
///
/// This is the only place the control byte layout is branched on.
#[inline(always)]
#[must_use]
pub fn classify(first: u8) -> CommandKind {
    match first {
        0x00..=0x7F => CommandKind::Short,
        STOP_BYTE => CommandKind::Stop,
        0x81..=0xBF => CommandKind::Literal,
        0xC0..=0xFD => CommandKind::Medium,
        FILL_BYTE => CommandKind::Fill,
        LONG_BYTE => CommandKind::Long,
    }
}

/// Decoded control codes
///
/// ## Key for description:
/// - Len: Length of the command in bytes, not counting literal payload
/// - Length: Possible range of copy length
/// - Source: How the copy source is encoded
/// - Layout: Bit layout of the command bytes
///
/// ### Key for layout
/// - `0` or `1`: header
/// - `D`: Distance back from the output position
/// - `L`: Length
/// - `O`: 16 bit little endian offset
/// - `N`: 16 bit little endian length
/// - `V`: fill value
/// - `B`: Literal bytes length
/// - `-`: Nibble Separator
/// - `:`: Byte Separator
///
/// ## Commands
///
/// | Command | Len | Length        | Source         | Layout                        |
/// |---------|-----|---------------|----------------|-------------------------------|
/// | Short   | 2   | (3..=10) +3   | distance 12bit | `0LLL-DDDD:DDDD-DDDD`         |
/// | Literal | 1   | (1..=63)      | stream         | `10BB-BBBB`                   |
/// | Medium  | 3   | (3..=64) +3   | offset         | `11LL-LLLL:OOOO-OOOO:OOOO-OOOO` |
/// | Fill    | 4   | (0..=65535)   | value          | `1111-1110:N:N:V`             |
/// | Long    | 5   | (0..=65535)   | offset         | `1111-1111:N:N:O:O`           |
/// | Stop    | 1   | 0             | none           | `1000-0000`                   |
///
/// Medium and long copies read their offset as an index from the start of the
/// output, unless the stream is decoded with
/// [OffsetMode::Relative](crate::lcw::OffsetMode::Relative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Short { distance: u16, length: u16 },
    Literal(u8),
    Medium { offset: u16, length: u16 },
    Fill { length: u16, value: u8 },
    Long { offset: u16, length: u16 },
    Stop,
}

impl Command {
    /// Create a new back-reference copy command, picking the smallest
    /// encoding able to express it. `distance` is measured back from the
    /// position the copy is written to, `offset` from the start of the output.
    ///
    /// Returns `None` when neither form can encode the copy.
    #[must_use]
    pub fn new_copy(position: usize, source: usize, length: usize) -> Option<Self> {
        if source >= position || length < SHORT_LENGTH_MIN as usize {
            return None;
        }
        let distance = position - source;
        if distance <= SHORT_DISTANCE_MAX as usize && length <= SHORT_LENGTH_MAX as usize {
            Some(Self::Short {
                distance: distance as u16,
                length: length as u16,
            })
        } else if source <= u16::MAX as usize {
            if length <= MEDIUM_LENGTH_MAX as usize {
                Some(Self::Medium {
                    offset: source as u16,
                    length: length as u16,
                })
            } else {
                Some(Self::Long {
                    offset: source as u16,
                    length: length.min(LONG_LENGTH_MAX as usize) as u16,
                })
            }
        } else if distance <= SHORT_DISTANCE_MAX as usize {
            Some(Self::Short {
                distance: distance as u16,
                length: SHORT_LENGTH_MAX,
            })
        } else {
            None
        }
    }

    /// Creates a new literal command
    /// # Panics
    /// Panics if `length` is 0 or longer than [LITERAL_MAX]
    #[must_use]
    pub fn new_literal(length: usize) -> Self {
        assert!(
            (1..=LITERAL_MAX as usize).contains(&length),
            "Literal received an invalid length (max {LITERAL_MAX}, got {length})"
        );
        Self::Literal(length as u8)
    }

    /// Number of bytes the command adds to the output
    #[must_use]
    pub fn output_length(self) -> usize {
        match self {
            Self::Short { length, .. }
            | Self::Medium { length, .. }
            | Self::Fill { length, .. }
            | Self::Long { length, .. } => length as usize,
            Self::Literal(literal) => literal as usize,
            Self::Stop => 0,
        }
    }

    /// Number of literal bytes following the command in the stream
    #[must_use]
    pub fn num_of_literal(self) -> usize {
        match self {
            Self::Literal(literal) => literal as usize,
            _ => 0,
        }
    }

    #[must_use]
    pub fn kind(self) -> CommandKind {
        match self {
            Self::Short { .. } => CommandKind::Short,
            Self::Literal(_) => CommandKind::Literal,
            Self::Medium { .. } => CommandKind::Medium,
            Self::Fill { .. } => CommandKind::Fill,
            Self::Long { .. } => CommandKind::Long,
            Self::Stop => CommandKind::Stop,
        }
    }

    /// Returns true if the command is a stopcode, false if it is not.
    #[must_use]
    pub fn is_stop(self) -> bool {
        self == Self::Stop
    }

    /// Reads and decodes a command from the stream. Literal bytes are left in
    /// the stream.
    ///
    /// # Errors
    /// - [DecodeError::TruncatedStream]: the stream ended inside the command
    #[inline(always)]
    pub(crate) fn read(blob: &mut CompressedBlob) -> Result<Self, DecodeError> {
        let first = blob.read_u8()?;

        let command = match classify(first) {
            CommandKind::Short => {
                let second = blob.read_u8()?;
                Self::Short {
                    distance: (u16::from(first & 0b0000_1111) << 8) | u16::from(second),
                    length: u16::from((first & 0b0111_0000) >> 4) + SHORT_LENGTH_MIN,
                }
            }
            CommandKind::Literal => Self::Literal(first & 0b0011_1111),
            CommandKind::Medium => Self::Medium {
                length: u16::from(first & 0b0011_1111) + MEDIUM_LENGTH_MIN,
                offset: blob.read_u16()?,
            },
            CommandKind::Fill => {
                let length = blob.read_u16()?;
                let value = blob.read_u8()?;
                Self::Fill { length, value }
            }
            CommandKind::Long => {
                let length = blob.read_u16()?;
                let offset = blob.read_u16()?;
                Self::Long { offset, length }
            }
            CommandKind::Stop => Self::Stop,
        };

        Ok(command)
    }

    /// Encodes and writes a command to a writer
    ///
    /// # Errors
    /// - [WestwoodError::Io](crate::WestwoodError::Io): Generic IO error
    ///   occurred while attempting to write data
    pub fn write(self, writer: &mut impl Write) -> WestwoodResult<()> {
        match self {
            Self::Short { distance, length } => {
                let length_adjusted = (length - SHORT_LENGTH_MIN) as u8;
                writer.write_u8(((length_adjusted & 0b0111) << 4) | (distance >> 8) as u8 & 0x0F)?;
                writer.write_u8((distance & 0xFF) as u8)?;
            }
            Self::Literal(literal) => {
                writer.write_u8(STOP_BYTE | (literal & 0b0011_1111))?;
            }
            Self::Medium { offset, length } => {
                let length_adjusted = (length - MEDIUM_LENGTH_MIN) as u8;
                writer.write_u8(0b1100_0000 | (length_adjusted & 0b0011_1111))?;
                writer.write_u16::<LittleEndian>(offset)?;
            }
            Self::Fill { length, value } => {
                writer.write_u8(FILL_BYTE)?;
                writer.write_u16::<LittleEndian>(length)?;
                writer.write_u8(value)?;
            }
            Self::Long { offset, length } => {
                writer.write_u8(LONG_BYTE)?;
                writer.write_u16::<LittleEndian>(length)?;
                writer.write_u16::<LittleEndian>(offset)?;
            }
            Self::Stop => writer.write_u8(STOP_BYTE)?,
        }
        Ok(())
    }
}

/// Full control block of command + literal bytes following it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// The command code
    pub command: Command,
    /// the literal bytes to write to the stream
    pub bytes: Vec<u8>,
}

impl Control {
    /// Create a new Control given a command and bytes
    #[must_use]
    pub fn new(command: Command, bytes: Vec<u8>) -> Self {
        Self { command, bytes }
    }

    /// Create a new literal block given a slice of bytes.
    /// the `Command` is automatically generated from the length of the byte
    /// slice.
    #[must_use]
    pub fn new_literal_block(bytes: &[u8]) -> Self {
        Self {
            command: Command::new_literal(bytes.len()),
            bytes: bytes.to_vec(),
        }
    }

    #[must_use]
    pub fn new_stop() -> Self {
        Self {
            command: Command::Stop,
            bytes: vec![],
        }
    }

    /// Encodes and writes a control block to a writer
    /// # Errors
    /// - [WestwoodError::Io](crate::WestwoodError::Io): Generic IO Error
    ///   occurred while attempting to write data
    pub fn write(&self, writer: &mut impl Write) -> WestwoodResult<()> {
        self.command.write(writer)?;
        writer.write_all(&self.bytes)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    pub fn generate_random_valid_command() -> BoxedStrategy<Command> {
        let short_strat = (0..=SHORT_DISTANCE_MAX, SHORT_LENGTH_MIN..=SHORT_LENGTH_MAX)
            .prop_map(|(distance, length)| Command::Short { distance, length });
        let literal_strat = (1..=LITERAL_MAX).prop_map(Command::Literal);
        let medium_strat = (any::<u16>(), MEDIUM_LENGTH_MIN..=MEDIUM_LENGTH_MAX)
            .prop_map(|(offset, length)| Command::Medium { offset, length });
        let fill_strat =
            (any::<u16>(), any::<u8>()).prop_map(|(length, value)| Command::Fill { length, value });
        let long_strat = (any::<u16>(), any::<u16>())
            .prop_map(|(offset, length)| Command::Long { offset, length });

        prop_oneof![
            short_strat,
            literal_strat,
            medium_strat,
            fill_strat,
            long_strat,
            Just(Command::Stop)
        ]
        .boxed()
    }

    #[proptest]
    fn symmetrical_any_command(#[strategy(generate_random_valid_command())] input: Command) {
        let mut buf = vec![];
        input.write(&mut buf).unwrap();
        prop_assert_eq!(classify(buf[0]), input.kind());
        let out = Command::read(&mut CompressedBlob::new(&buf)).unwrap();

        prop_assert_eq!(out, input);
    }

    #[proptest]
    fn truncated_command_is_reported(
        #[strategy(generate_random_valid_command())] input: Command,
    ) {
        let mut buf = vec![];
        input.write(&mut buf).unwrap();
        buf.pop();
        let error = Command::read(&mut CompressedBlob::new(&buf));
        prop_assert!(matches!(error, Err(DecodeError::TruncatedStream(_))));
    }

    #[test]
    fn classify_covers_boundaries() {
        assert_eq!(classify(0x00), CommandKind::Short);
        assert_eq!(classify(0x7F), CommandKind::Short);
        assert_eq!(classify(0x80), CommandKind::Stop);
        assert_eq!(classify(0x81), CommandKind::Literal);
        assert_eq!(classify(0xBF), CommandKind::Literal);
        assert_eq!(classify(0xC0), CommandKind::Medium);
        assert_eq!(classify(0xFD), CommandKind::Medium);
        assert_eq!(classify(0xFE), CommandKind::Fill);
        assert_eq!(classify(0xFF), CommandKind::Long);
    }

    #[test]
    fn short_command_layout() {
        let mut buf = vec![];
        Command::Short {
            distance: 0x123,
            length: 5,
        }
        .write(&mut buf)
        .unwrap();
        assert_eq!(buf, [0x21, 0x23]);
    }

    #[test]
    fn new_copy_picks_smallest_form() {
        assert_eq!(
            Command::new_copy(10, 9, 5),
            Some(Command::Short {
                distance: 1,
                length: 5
            })
        );
        assert_eq!(
            Command::new_copy(10, 0, 64),
            Some(Command::Medium {
                offset: 0,
                length: 64
            })
        );
        assert_eq!(
            Command::new_copy(1_000, 2, 65),
            Some(Command::Long {
                offset: 2,
                length: 65
            })
        );
        assert_eq!(Command::new_copy(200_000, 100_000, 20), None);
        assert_eq!(Command::new_copy(10, 10, 20), None);
        assert_eq!(Command::new_copy(10, 5, 2), None);
    }

    #[test]
    #[should_panic]
    fn command_reject_new_literal_invalid() {
        let _invalid = Command::new_literal(64);
    }

    #[test]
    #[should_panic]
    fn command_reject_new_literal_empty() {
        let _invalid = Command::new_literal(0);
    }
}
