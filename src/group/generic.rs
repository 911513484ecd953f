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

//! SWAR (SIMD within a register) group scanning for targets without SSE2.
//!
//! Each group is a machine word (`u64` on 64-bit targets, `u32` on 32-bit
//! ones) holding `WIDTH` control bytes, stored little-endian so that lane
//! `i` always lives in bits `[8*i, 8*i+8)` regardless of host endianness.
//! Byte-wise comparisons use the "haszero" bit trick: XOR the word against
//! the byte replicated across every lane, then
//! `(x - 0x0101...) & !x & 0x8080...` leaves a set high bit in every lane
//! that was zero (i.e. matched) before the XOR. False positives can occur
//! but never on `Empty`/`Deleted`/`Sentinel`, and callers always confirm
//! matches with a real key-equality check afterwards.

use crate::bitmask::BitMask;
use crate::ctrl;
use core::mem;

#[cfg(target_pointer_width = "64")]
type GroupWord = u64;
#[cfg(not(target_pointer_width = "64"))]
type GroupWord = u32;

const LSBS: GroupWord = 0x0101_0101_0101_0101_u64 as GroupWord;
const MSBS: GroupWord = 0x8080_8080_8080_8080_u64 as GroupWord;

#[inline]
fn repeat(byte: u8) -> GroupWord {
    GroupWord::from_ne_bytes([byte; Group::WIDTH])
}

#[derive(Clone, Copy)]
pub struct Group(GroupWord);

impl Group {
    pub const WIDTH: usize = mem::size_of::<GroupWord>();
    const SHIFT: u32 = 3;

    #[inline]
    pub const fn static_empty() -> &'static [u8; Self::WIDTH] {
        &[ctrl::EMPTY as u8; Self::WIDTH]
    }

    /// # Safety
    /// `ptr` must point to at least `WIDTH` readable bytes.
    #[inline]
    pub unsafe fn load(ptr: *const i8) -> Self {
        Group(core::ptr::read_unaligned(ptr.cast::<GroupWord>()))
    }

    #[inline]
    pub fn match_byte(self, byte: u8) -> BitMask {
        let cmp = self.0 ^ repeat(byte);
        let matched = cmp.wrapping_sub(LSBS) & !cmp & MSBS;
        BitMask::new(matched.to_le() as u64, Self::WIDTH as u32, Self::SHIFT)
    }

    #[inline]
    pub fn match_empty(self) -> BitMask {
        self.match_byte(ctrl::EMPTY as u8)
    }

    #[inline]
    pub fn match_empty_or_deleted(self) -> BitMask {
        // Bit 7 of a lane is set in the result iff bit 7 of the byte is set
        // and bit 0 is clear: true for Empty (0x80) and Deleted (0xFE), false
        // for Sentinel (0xFF, bit 0 set) and every Full byte (bit 7 clear).
        let matched = self.0 & (!self.0 << 7) & MSBS;
        BitMask::new(matched.to_le() as u64, Self::WIDTH as u32, Self::SHIFT)
    }

    #[inline]
    pub fn match_full(self) -> BitMask {
        self.match_empty_or_deleted().invert()
    }

    /// DELETED -> EMPTY, EMPTY -> EMPTY, FULL -> DELETED (bytewise).
    #[inline]
    pub fn convert_special_to_empty_and_full_to_deleted(self) -> [u8; Self::WIDTH] {
        let full = !self.0 & MSBS;
        let res = (!full).wrapping_add(full >> 7) & !LSBS;
        res.to_ne_bytes().as_ref().try_into().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(g: Group) -> [u8; Group::WIDTH] {
        g.0.to_ne_bytes()
    }

    #[test]
    fn match_byte_finds_exact_lanes() {
        let mut raw = [ctrl::EMPTY as u8; Group::WIDTH];
        raw[1] = 0x05;
        raw[3] = 0x05;
        let group = unsafe { Group::load(raw.as_ptr().cast()) };
        let got: Vec<usize> = group.match_byte(0x05).iter().collect();
        assert_eq!(got, vec![1, 3]);
    }

    #[test]
    fn match_empty_excludes_deleted_and_full() {
        let mut raw = [0u8; Group::WIDTH];
        raw[0] = ctrl::EMPTY as u8;
        raw[1] = ctrl::DELETED as u8;
        raw[2] = 5;
        let group = unsafe { Group::load(raw.as_ptr().cast()) };
        let got: Vec<usize> = group.match_empty().iter().collect();
        assert_eq!(got, vec![0]);
    }

    #[test]
    fn match_empty_or_deleted_excludes_sentinel() {
        let mut raw = [5u8; Group::WIDTH];
        raw[0] = ctrl::EMPTY as u8;
        raw[1] = ctrl::DELETED as u8;
        raw[2] = ctrl::SENTINEL as u8;
        let group = unsafe { Group::load(raw.as_ptr().cast()) };
        let got: Vec<usize> = group.match_empty_or_deleted().iter().collect();
        assert_eq!(got, vec![0, 1]);
    }

    #[test]
    fn convert_special_to_empty_and_full_to_deleted_roundtrip() {
        let mut raw = [0u8; Group::WIDTH];
        raw[0] = ctrl::EMPTY as u8;
        raw[1] = ctrl::DELETED as u8;
        raw[2] = 5;
        let group = unsafe { Group::load(raw.as_ptr().cast()) };
        let converted = bytes(Group(GroupWord::from_ne_bytes(
            group.convert_special_to_empty_and_full_to_deleted(),
        )));
        assert_eq!(converted[0] as i8, ctrl::EMPTY);
        assert_eq!(converted[1] as i8, ctrl::EMPTY);
        assert_eq!(converted[2] as i8, ctrl::DELETED);
    }
}
