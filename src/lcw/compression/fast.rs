////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

use crate::lcw::command::{Command, Control, LONG_LENGTH_MAX};
use crate::lcw::compression::prefix_table::{prefix, PrefixTable};
use crate::lcw::compression::{try_fill, LiteralBlock};

/// Bytes taken in the stream by a copy command
fn command_cost(command: Command) -> usize {
    match command {
        Command::Short { .. } => 2,
        Command::Medium { .. } => 3,
        _ => 5,
    }
}

/// find the length of common bytes between two positions in a buffer
fn match_length(buffer: &[u8], source: usize, matched_pos: usize, max_len: usize) -> usize {
    buffer[source..]
        .iter()
        .take(max_len)
        .zip(&buffer[matched_pos..])
        .take_while(|(a, b)| a == b)
        .count()
}

/// Encodes `input` to controls using fills, literals and back-references to
/// the last occurrence of each three byte prefix
pub(crate) fn encode(input: &[u8]) -> Vec<Control> {
    let mut controls: Vec<Control> = vec![];
    let mut literal_block = LiteralBlock::default();
    let mut prefix_table = PrefixTable::new(input.len());

    let mut i = 0;
    while i < input.len() {
        let filled = try_fill(input, i, &mut literal_block, &mut controls);
        if filled > 0 {
            i += filled;
            continue;
        }

        // get the position of the prefix in the table (if it exists)
        let matched = if i + 3 <= input.len() {
            prefix_table.insert(prefix(&input[i..]), i as u32)
        } else {
            None
        };

        let copy = matched.and_then(|found| {
            let found = found as usize;
            let length = match_length(input, i, found, LONG_LENGTH_MAX as usize);
            // only take copies that are smaller than the literals they replace
            Command::new_copy(i, found, length)
                .filter(|command| command_cost(*command) < command.output_length())
        });

        if let Some(command) = copy {
            literal_block.flush(&mut controls);
            controls.push(Control::new(command, vec![]));

            let end = i + command.output_length();
            for k in (i + 1)..end {
                if k + 3 > input.len() {
                    break;
                }
                prefix_table.insert(prefix(&input[k..]), k as u32);
            }
            i = end;
        } else {
            literal_block.push(input[i], &mut controls);
            i += 1;
        }
    }
    literal_block.flush(&mut controls);
    controls.push(Control::new_stop());

    controls
}
