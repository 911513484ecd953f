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

//! SSE2 group scanning, one match bit per lane via `_mm_movemask_epi8`.
//!
//! Available on `x86`/`x86_64` targets with SSE2 enabled (baseline on all
//! x86_64 CPUs). Falls back to `generic` everywhere else.

use crate::bitmask::BitMask;
use crate::ctrl;

#[cfg(target_arch = "x86")]
use core::arch::x86;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64 as x86;

#[derive(Clone, Copy)]
pub struct Group(x86::__m128i);

impl Group {
    pub const WIDTH: usize = 16;
    const SHIFT: u32 = 0;

    #[inline]
    pub const fn static_empty() -> &'static [u8; Self::WIDTH] {
        &[ctrl::EMPTY as u8; Self::WIDTH]
    }

    /// # Safety
    /// `ptr` must point to at least `WIDTH` readable bytes.
    #[inline]
    pub unsafe fn load(ptr: *const i8) -> Self {
        Group(x86::_mm_loadu_si128(ptr.cast()))
    }

    #[inline]
    pub fn match_byte(self, byte: u8) -> BitMask {
        unsafe {
            let cmp = x86::_mm_cmpeq_epi8(self.0, x86::_mm_set1_epi8(byte as i8));
            let mask = x86::_mm_movemask_epi8(cmp) as u32 as u64;
            BitMask::new(mask, Self::WIDTH as u32, Self::SHIFT)
        }
    }

    #[inline]
    pub fn match_empty(self) -> BitMask {
        self.match_byte(ctrl::EMPTY as u8)
    }

    #[inline]
    pub fn match_empty_or_deleted(self) -> BitMask {
        // Signed `Sentinel > ctrl` is true exactly for Empty (-128) and
        // Deleted (-2); Sentinel (-1) isn't greater than itself and every
        // Full byte is non-negative, so neither matches.
        unsafe {
            let cmp = x86::_mm_cmpgt_epi8(x86::_mm_set1_epi8(ctrl::SENTINEL), self.0);
            let mask = x86::_mm_movemask_epi8(cmp) as u32 as u64;
            BitMask::new(mask, Self::WIDTH as u32, Self::SHIFT)
        }
    }

    #[inline]
    pub fn match_full(self) -> BitMask {
        self.match_empty_or_deleted().invert()
    }

    /// DELETED -> EMPTY, EMPTY -> EMPTY, FULL -> DELETED (bytewise).
    #[inline]
    pub fn convert_special_to_empty_and_full_to_deleted(self) -> [u8; Self::WIDTH] {
        unsafe {
            let zero = x86::_mm_setzero_si128();
            let special = x86::_mm_cmpgt_epi8(zero, self.0);
            let res = x86::_mm_or_si128(special, x86::_mm_set1_epi8(0x80_u8 as i8));
            let mut out = [0u8; Self::WIDTH];
            x86::_mm_storeu_si128(out.as_mut_ptr().cast(), res);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
        let converted = group.convert_special_to_empty_and_full_to_deleted();
        assert_eq!(converted[0] as i8, ctrl::EMPTY);
        assert_eq!(converted[1] as i8, ctrl::EMPTY);
        assert_eq!(converted[2] as i8, ctrl::DELETED);
    }
}
