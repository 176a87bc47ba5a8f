////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

use std::collections::BTreeMap;

const SMALL_TABLE_CUTOFF: usize = 8192;
const LARGE_TABLE_BITS: u32 = 16;

pub(crate) fn prefix(input_buf: &[u8]) -> [u8; 3] {
    [input_buf[0], input_buf[1], input_buf[2]]
}

fn key(prefix: [u8; 3]) -> u32 {
    (u32::from(prefix[0]) << 16) | (u32::from(prefix[1]) << 8) | u32::from(prefix[2])
}

/// Maps each three byte prefix to the last position it was seen at
#[derive(Debug)]
pub(crate) enum PrefixTable {
    Small(BTreeMap<u32, u32>),
    // hashed slots of (prefix, position); a colliding prefix evicts the slot
    Large(Vec<Option<(u32, u32)>>),
}

impl PrefixTable {
    pub(crate) fn new(bytes: usize) -> Self {
        if bytes < SMALL_TABLE_CUTOFF {
            PrefixTable::Small(BTreeMap::new())
        } else {
            PrefixTable::Large(vec![None; 1 << LARGE_TABLE_BITS])
        }
    }

    /// Records `position` for `prefix`, returning the previous position
    pub(crate) fn insert(&mut self, prefix: [u8; 3], position: u32) -> Option<u32> {
        match self {
            PrefixTable::Small(table) => table.insert(key(prefix), position),
            PrefixTable::Large(table) => {
                let key = key(prefix);
                let hash = key.wrapping_mul(2_654_435_761) >> (32 - LARGE_TABLE_BITS);
                let slot = &mut table[hash as usize];
                let old = match *slot {
                    Some((found, old)) if found == key => Some(old),
                    _ => None,
                };
                *slot = Some((key, position));
                old
            }
        }
    }
}
