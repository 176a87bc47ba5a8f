////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

use crate::lcw::command::Control;
use crate::lcw::compression::{try_fill, LiteralBlock};

/// Encodes `input` to fill and literal controls only, ending with a stop
pub(crate) fn encode(input: &[u8]) -> Vec<Control> {
    let mut controls: Vec<Control> = vec![];
    let mut literal_block = LiteralBlock::default();

    let mut i = 0;
    while i < input.len() {
        let filled = try_fill(input, i, &mut literal_block, &mut controls);
        if filled > 0 {
            i += filled;
        } else {
            literal_block.push(input[i], &mut controls);
            i += 1;
        }
    }
    literal_block.flush(&mut controls);
    controls.push(Control::new_stop());

    controls
}
