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

//! Capacity arithmetic: which capacities are legal, how many elements they
//! can hold before a resize is due, and how the control/slot arrays are
//! laid out in a single allocation.
//!
//! A `capacity` here is always one less than a power of two (`0`, `1`, `3`,
//! `7`, `15`, ...) so that `capacity` doubles as the bucket mask. The
//! "growth left" a table offers is capped at 7/8 of capacity (the max load
//! factor), with small-table corner cases carried over from `cwisstable`
//! verbatim since they exist to keep one-group tables from needlessly
//! growing on their 7th insert.

use crate::group::Group;
use core::alloc::Layout;
use core::mem;

/// A capacity is valid iff it is strictly positive and of the form `2^k - 1`.
#[inline]
pub const fn is_valid_capacity(n: usize) -> bool {
    n > 0 && (n + 1) & n == 0
}

/// Rounds `n` up to the nearest valid capacity (`2^k - 1`), with a floor of 1
/// so a requested capacity of 0 still gets a single group to scan.
#[inline]
pub fn normalize_capacity(n: usize) -> usize {
    if n == 0 {
        1
    } else {
        usize::MAX >> n.leading_zeros()
    }
}

/// How many elements a table of this capacity can hold before `growth_left`
/// hits zero and a resize is forced. Max load factor is 7/8, except that a
/// single `Group::WIDTH == 8` group (`capacity == 7`) is capped at 6 so it
/// always keeps one empty slot for probe termination.
#[inline]
pub fn capacity_to_growth(capacity: usize) -> usize {
    if Group::WIDTH == 8 && capacity == 7 {
        return 6;
    }
    capacity - capacity / 8
}

/// The smallest capacity whose growth covers `growth`; the inverse of
/// [`capacity_to_growth`], used when a caller asks to reserve space for at
/// least `growth` more elements.
#[inline]
pub fn growth_to_lower_bound_capacity(growth: usize) -> usize {
    if Group::WIDTH == 8 && growth == 7 {
        return 8;
    }
    growth + (growth.saturating_sub(1)) / 7
}

/// Is this capacity small enough that every slot lives in a single group?
/// Below this point probing never wraps the control array more than once,
/// which several debug-only checks rely on.
#[inline]
pub const fn is_small(capacity: usize) -> bool {
    capacity < Group::WIDTH - 1
}

/// How many control bytes at the end of the control array duplicate the
/// first `Group::WIDTH - 1` bytes, so a group load starting near the end of
/// the array never reads out of bounds.
#[inline]
pub fn num_cloned_bytes() -> usize {
    Group::WIDTH - 1
}

/// Byte layout of the single allocation backing a table's control array and
/// slot array: control bytes first (length `capacity + 1 + num_cloned_bytes`),
/// then slots (length `capacity`), with the slot array's alignment
/// determining any padding between the two.
#[derive(Clone, Copy, Debug)]
pub struct TableLayout {
    pub size: usize,
    pub ctrl_align: usize,
    pub slot_offset: usize,
}

impl TableLayout {
    /// # Safety
    /// `slot_size`/`slot_align` must match the real slot type; this is only
    /// ever called with `mem::size_of::<Slot>()`/`mem::align_of::<Slot>()`.
    pub fn new(slot_size: usize, slot_align: usize, capacity: usize) -> Self {
        let ctrl_align = mem::align_of::<Group>().max(8);
        let ctrl_count = capacity + 1 + num_cloned_bytes();
        let slot_offset = ctrl_count.next_multiple_of(slot_align.max(1));
        let size = slot_offset + slot_size * capacity;
        TableLayout {
            size,
            ctrl_align: ctrl_align.max(slot_align),
            slot_offset,
        }
    }

    /// The `Layout` to hand to the allocator for this table's single
    /// backing allocation.
    pub fn alloc_layout(self) -> Layout {
        Layout::from_size_align(self.size, self.ctrl_align)
            .expect("table layout overflowed isize::MAX")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rounds_up_to_power_of_two_minus_one() {
        assert_eq!(normalize_capacity(0), 1);
        assert_eq!(normalize_capacity(1), 1);
        assert_eq!(normalize_capacity(2), 3);
        assert_eq!(normalize_capacity(4), 7);
        assert_eq!(normalize_capacity(8), 15);
    }

    #[test]
    fn valid_capacities_are_powers_of_two_minus_one() {
        for n in [1, 3, 7, 15, 31, 63] {
            assert!(is_valid_capacity(n), "{n} should be valid");
        }
        for n in [0, 2, 4, 5, 6, 8, 16] {
            assert!(!is_valid_capacity(n), "{n} should be invalid");
        }
    }

    #[test]
    fn growth_round_trips_through_lower_bound() {
        for capacity in [1, 3, 7, 15, 31, 63, 127] {
            let growth = capacity_to_growth(capacity);
            let lower_bound = growth_to_lower_bound_capacity(growth);
            assert!(
                lower_bound <= capacity,
                "growth_to_lower_bound_capacity({growth}) = {lower_bound} > {capacity}"
            );
        }
    }

    #[test]
    fn table_layout_places_slots_after_control_bytes() {
        let layout = TableLayout::new(8, 8, 7);
        assert!(layout.slot_offset >= 7 + 1 + num_cloned_bytes());
        assert_eq!(layout.size, layout.slot_offset + 8 * 7);
    }
}
