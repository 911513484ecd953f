/*
 * This file is a part of skymap
 *
 * skymap is a SwissTable-style open-addressed hash table: a from-scratch
 * reimplementation of the probing/control-byte/group-scanning design this
 * crate's author first vendored (unfinished) into Skytable's storage
 * engine, completed here as a standalone library.
 *
 * Copyright (c) 2021, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! A small, fast, non-cryptographic default hasher, ported from
//! `cwisstable`'s `CWISS_FxHash`: rotate-left-5, xor, multiply by a fixed
//! odd constant, consumed one machine word at a time. Not resistant to
//! adversarial input; callers with that threat model should supply their
//! own `BuildHasher`.

use core::hash::{BuildHasher, Hasher};

const SEED: u64 = 0x51_7c_c1_b7_27_22_0a_95;

#[derive(Clone, Copy, Default)]
pub struct FxBuildHasher;

impl BuildHasher for FxBuildHasher {
    type Hasher = FxHasher;

    #[inline]
    fn build_hasher(&self) -> FxHasher {
        FxHasher { state: 0 }
    }
}

pub struct FxHasher {
    state: u64,
}

impl FxHasher {
    #[inline]
    fn write_word(&mut self, word: u64) {
        self.state = (self.state.rotate_left(5) ^ word).wrapping_mul(SEED);
    }
}

impl Hasher for FxHasher {
    #[inline]
    fn write(&mut self, mut bytes: &[u8]) {
        while bytes.len() >= 8 {
            let (chunk, rest) = bytes.split_at(8);
            self.write_word(u64::from_ne_bytes(chunk.try_into().unwrap()));
            bytes = rest;
        }
        if !bytes.is_empty() {
            let mut buf = [0u8; 8];
            buf[..bytes.len()].copy_from_slice(bytes);
            self.write_word(u64::from_ne_bytes(buf));
        }
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.write_word(i as u64);
    }

    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.write_word(i as u64);
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.write_word(i as u64);
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.write_word(i);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.write_word(i as u64);
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }
}
