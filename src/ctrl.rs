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

//! Control byte encoding and the H1/H2 hash split.
//!
//! A control byte is a signed tag describing one slot: `Empty`, `Deleted`,
//! `Sentinel`, or `Full(h2)` where `h2` is the low 7 bits of the slot's
//! hash. The encoding is chosen so that SIMD/SWAR group scans can test for
//! these states with a handful of bitwise operations; see `group/`.

/// Slot holds nothing and has never held anything since the last reset.
pub const EMPTY: i8 = -128_i8; // 0x80
/// Slot used to hold a value that was erased; acts as a "keep probing" marker.
pub const DELETED: i8 = -2_i8; // 0xFE
/// The one-past-the-end marker written at `ctrl[capacity]`.
pub const SENTINEL: i8 = -1_i8; // 0xFF

pub type H2 = u8;

/// Is the top bit unset, i.e. is this control byte `Full`?
#[inline]
pub const fn is_full(ctrl: i8) -> bool {
    ctrl & 0x80 == 0
}

/// Is the top bit set, i.e. is this control byte `Empty`, `Deleted`, or `Sentinel`?
#[inline]
pub const fn is_empty_or_deleted_or_sentinel(ctrl: i8) -> bool {
    ctrl & 0x80 != 0
}

/// Empty and Deleted are both strictly less than Sentinel (-1); Full bytes
/// are always non-negative. This is the scalar equivalent of the SIMD
/// "is empty or deleted" check.
#[inline]
pub const fn is_empty_or_deleted(ctrl: i8) -> bool {
    ctrl < SENTINEL
}

#[inline]
pub const fn is_empty(ctrl: i8) -> bool {
    ctrl == EMPTY
}

#[inline]
pub const fn is_deleted(ctrl: i8) -> bool {
    ctrl == DELETED
}

/// The H1 hash: the bits used to select a starting group. XORed with a
/// pointer-derived seed (the control array's address, shifted by 12 to
/// discard page-aligned low bits) so that iteration order differs across
/// tables and process runs.
#[inline]
pub fn h1(hash: u64, ctrl: *const i8) -> usize {
    let seed = (ctrl as usize) >> 12;
    (hash >> 7) as usize ^ seed
}

/// The H2 hash: the low 7 bits, stored directly as a control byte for `Full`
/// slots.
#[inline]
pub fn h2(hash: u64) -> H2 {
    (hash & 0x7f) as H2
}
