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

//! Triangular probing: the sequence of groups a lookup or insert visits
//! after the initial `h1`-selected group misses.
//!
//! Each step advances by one more group than the last (stride 1, 2, 3, ...
//! times `Group::WIDTH`), which visits every group exactly once for any
//! power-of-two-minus-one bucket mask and never revisits a group until the
//! full table has been scanned.

use crate::group::Group;

#[derive(Clone, Copy, Debug)]
pub struct ProbeSeq {
    pos: usize,
    stride: usize,
    mask: usize,
}

impl ProbeSeq {
    #[inline]
    pub fn new(hash: usize, mask: usize) -> Self {
        ProbeSeq {
            pos: hash & mask,
            stride: 0,
            mask,
        }
    }

    /// The index of the first control byte of the group this step names.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn move_next(&mut self) {
        self.stride += Group::WIDTH;
        self.pos += self.stride;
        self.pos &= self.mask;
    }
}

/// True when `capacity` is small enough that a single group covers the
/// whole table; several debug-only checks only make sense above this size,
/// since below it every probe sequence step revisits the same group.
#[inline]
pub const fn is_small(capacity: usize) -> bool {
    capacity < Group::WIDTH - 1
}

/// A cheap, non-cryptographic per-thread counter used only to decide, in
/// debug builds, whether `find_first_non_full` should prefer the first or
/// the last matching lane within a group. Exists purely to shake out bugs
/// in code that assumes insertion always takes the lowest empty slot;
/// never compiled into release builds.
#[cfg(debug_assertions)]
fn random_seed() -> usize {
    use core::cell::Cell;
    thread_local! {
        static COUNTER: Cell<usize> = const { Cell::new(0) };
    }
    COUNTER.with(|c| {
        let addr = c as *const _ as usize;
        let n = c.get().wrapping_add(1);
        c.set(n);
        n ^ addr
    })
}

#[cfg(debug_assertions)]
#[inline]
fn should_insert_backwards(hash: usize, capacity: usize) -> bool {
    !is_small(capacity) && (random_seed().wrapping_mul(hash) >> 32) & 1 == 1
}

/// Index of the first empty-or-deleted slot along `probe`'s sequence, plus
/// whether that slot requires a rehash-triggering lookup-probe-length bump
/// (i.e. whether `h2` bucketing for a brand-new entry needs the full group
/// scan or can stop at the first hit).
///
/// In debug builds, and only for tables big enough that more than one
/// candidate slot exists within the first matching group,
/// `should_insert_backwards` randomly prefers the *last* matching lane
/// instead of the first: production code must never depend on which one
/// it gets.
pub fn find_first_non_full(ctrl: *const i8, hash: u64, capacity: usize, mask: usize) -> usize {
    let mut probe = ProbeSeq::new(crate::ctrl::h1(hash, ctrl), mask);
    loop {
        unsafe {
            let group = Group::load(ctrl.add(probe.pos()));
            let bits = group.match_empty_or_deleted();
            if bits.any_bit_set() {
                #[cfg(debug_assertions)]
                {
                    if should_insert_backwards(hash as usize, capacity) {
                        return probe.pos() + bits.highest_set_bit().unwrap();
                    }
                }
                return probe.pos() + bits.lowest_set_bit().unwrap();
            }
        }
        probe.move_next();
    }
}
