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

//! `RawTable`: the engine underneath `SkyMap`/`SkySet`. Owns one allocation
//! holding a control byte array (with a cloned tail so group loads near the
//! wraparound point never read past the allocation) followed by a slot
//! array, and implements find/insert/erase/rehash/iterate purely in terms
//! of [`crate::group::Group`], [`crate::probe::ProbeSeq`], and the
//! caller-supplied hash/equality closures.
//!
//! Callers never see a slot index as anything but an opaque `usize`; the
//! only stability guarantee is "valid until the next insert/erase/clear",
//! matching the crate's Non-goal of stable iteration across mutation.

use crate::alloc::{Global, RawAlloc};
use crate::capacity::{capacity_to_growth, growth_to_lower_bound_capacity, normalize_capacity, TableLayout};
use crate::ctrl::{self, h2};
use crate::group::Group;
use crate::policy::{FlatSlot, SlotPolicy};
use crate::probe::find_first_non_full;
use crate::scopeguard::guard;
use crate::util::unlikely;

use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ptr::NonNull;

/// A slot reserved by [`RawTable::find_or_find_insert_slot`]'s `Err` case:
/// headroom has already been checked (growing/rehashing in place if
/// needed), but nothing has been written yet and `items`/control byte are
/// untouched. The only way to get one is from that call, so a hit and a
/// fresh insertion can never both land on the same key.
pub struct InsertSlot {
    index: usize,
    old_ctrl: i8,
}

pub struct RawTable<T, P: SlotPolicy<T> = FlatSlot<T>, A: RawAlloc = Global> {
    ctrl: NonNull<i8>,
    slots: NonNull<P::Slot>,
    bucket_mask: usize,
    growth_left: usize,
    items: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, P: SlotPolicy<T>, A: RawAlloc + Send> Send for RawTable<T, P, A> where
    P::Slot: Send
{
}
unsafe impl<T: Sync, P: SlotPolicy<T>, A: RawAlloc + Sync> Sync for RawTable<T, P, A> where
    P::Slot: Sync
{
}

impl<T, P: SlotPolicy<T>, A: RawAlloc + Default> Default for RawTable<T, P, A> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P: SlotPolicy<T>, A: RawAlloc + Default> RawTable<T, P, A> {
    /// An empty table with no allocation; the first insert allocates.
    #[inline]
    pub fn new() -> Self {
        RawTable {
            ctrl: NonNull::new(Group::static_empty().as_ptr() as *mut i8).unwrap(),
            slots: NonNull::dangling(),
            bucket_mask: 0,
            growth_left: 0,
            items: 0,
            alloc: A::default(),
            _marker: PhantomData,
        }
    }

    /// Matches §4.14 `new(bucket_count)`: `bucket_count` is a literal
    /// capacity request, normalized up to the nearest `2^k - 1` and
    /// allocated directly -- unlike `reserve`/`rehash`, it is not first
    /// translated through the growth/load-factor math.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self
    where
        A: Clone,
    {
        let mut table = Self::new();
        if capacity > 0 {
            let capacity = normalize_capacity(capacity);
            table.resize(capacity, |_| unreachable!("empty table never rehashes"));
        }
        table
    }
}

impl<T, P: SlotPolicy<T>, A: RawAlloc> RawTable<T, P, A> {
    #[inline]
    pub fn len(&self) -> usize {
        self.items
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Number of slots the table can hold without growing; `0` for the
    /// allocation-free empty table.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bucket_mask
    }

    #[inline]
    fn buckets(&self) -> usize {
        self.bucket_mask.wrapping_add(1)
    }

    #[inline]
    fn is_empty_singleton(&self) -> bool {
        self.bucket_mask == 0
    }

    #[inline]
    unsafe fn ctrl(&self, index: usize) -> *mut i8 {
        unsafe { self.ctrl.as_ptr().add(index) }
    }

    #[inline]
    unsafe fn slot(&self, index: usize) -> *mut P::Slot {
        unsafe { self.slots.as_ptr().add(index) }
    }

    /// Same slot, typed as uninitialized; only ever used to write a slot
    /// that has no live value yet (a fresh insert or a rehash/resize
    /// destination).
    #[inline]
    unsafe fn slot_uninit(&self, index: usize) -> *mut MaybeUninit<P::Slot> {
        unsafe { self.slots.as_ptr().add(index).cast() }
    }

    #[inline]
    unsafe fn set_ctrl(&mut self, index: usize, value: i8) {
        // Mirror writes into the cloned tail so a group load that straddles
        // the end of the real control bytes still sees fresh data.
        let index2 = ((index.wrapping_sub(Group::WIDTH)) & self.bucket_mask) + Group::WIDTH;
        unsafe {
            *self.ctrl(index) = value;
            *self.ctrl(index2) = value;
        }
    }

    #[inline]
    unsafe fn set_ctrl_h2(&mut self, index: usize, hash: u64) {
        unsafe { self.set_ctrl(index, h2(hash) as i8) }
    }

    /// Locates `hash` by scanning groups along its probe sequence, checking
    /// every lane whose control byte matches `h2(hash)` with `eq` and
    /// stopping as soon as a group has an empty lane (probing never skips
    /// past the first empty slot, so nothing further along could match).
    pub fn find(&self, hash: u64, mut eq: impl FnMut(&T) -> bool) -> Option<usize> {
        if self.items == 0 {
            return None;
        }
        let mut probe = crate::probe::ProbeSeq::new(ctrl::h1(hash, self.ctrl.as_ptr()), self.bucket_mask);
        loop {
            unsafe {
                let group = Group::load(self.ctrl(probe.pos()));
                for bit in group.match_byte(h2(hash)) {
                    let index = (probe.pos() + bit) & self.bucket_mask;
                    let val = P::get(&mut *self.slot(index));
                    if crate::util::likely(eq(val)) {
                        return Some(index);
                    }
                }
                if group.match_empty().any_bit_set() {
                    return None;
                }
            }
            probe.move_next();
        }
    }

    /// Finds the first empty-or-deleted slot for `hash`, assuming the
    /// caller has already checked growth headroom.
    fn find_insert_slot(&self, hash: u64) -> usize {
        find_first_non_full(self.ctrl.as_ptr(), hash, self.bucket_mask, self.bucket_mask)
            & self.bucket_mask
    }

    /// §4.8's `find_or_prepare_insert`, split into its two halves so the
    /// insertion-slot search runs at most once and a miss can be acted on
    /// lazily (the `Entry` API holds the `Err` slot across a call boundary
    /// instead of re-probing once the caller decides to insert).
    ///
    /// Walks `hash`'s probe sequence checking every `h2`-matching lane with
    /// `eq`; returns `Ok(index)` on a hit. On a miss -- the first group with
    /// an empty lane -- finds and budgets an insertion slot the same way
    /// `insert` does, and returns `Err` wrapping it.
    pub fn find_or_find_insert_slot(
        &mut self,
        hash: u64,
        mut eq: impl FnMut(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<usize, InsertSlot>
    where
        A: Clone,
    {
        if self.items > 0 {
            let mut probe = crate::probe::ProbeSeq::new(ctrl::h1(hash, self.ctrl.as_ptr()), self.bucket_mask);
            loop {
                unsafe {
                    let group = Group::load(self.ctrl(probe.pos()));
                    for bit in group.match_byte(h2(hash)) {
                        let index = (probe.pos() + bit) & self.bucket_mask;
                        let val = P::get(&mut *self.slot(index));
                        if crate::util::likely(eq(val)) {
                            return Ok(index);
                        }
                    }
                    if group.match_empty().any_bit_set() {
                        break;
                    }
                }
                probe.move_next();
            }
        }
        let mut index = self.find_insert_slot(hash);
        let mut old_ctrl = unsafe { *self.ctrl(index) };
        if unlikely(self.growth_left == 0 && ctrl::is_empty(old_ctrl)) {
            self.rehash_and_grow_if_necessary(&hasher);
            index = self.find_insert_slot(hash);
            old_ctrl = unsafe { *self.ctrl(index) };
        }
        Err(InsertSlot { index, old_ctrl })
    }

    /// Writes `value` into a slot obtained from `find_or_find_insert_slot`'s
    /// `Err` case, completing the bookkeeping (`items`, `growth_left`,
    /// control byte) that call deferred. Returns the slot index.
    ///
    /// # Safety
    /// `slot` must have come from the most recent `find_or_find_insert_slot`
    /// call on `self` that returned `Err`; any intervening insert, erase, or
    /// resize invalidates it.
    pub unsafe fn insert_in_slot(&mut self, slot: InsertSlot, hash: u64, value: T) -> usize {
        self.record_item_insert_at(slot.index, slot.old_ctrl, hash);
        unsafe { P::init(&mut *self.slot_uninit(slot.index), value) };
        slot.index
    }

    /// Inserts `value` unconditionally, growing (or rehashing in place)
    /// first if the table has no headroom left. Returns the slot index
    /// `value` landed in.
    ///
    /// Does not check whether an equal key already exists -- callers that
    /// need find-then-insert semantics should use
    /// `find_or_find_insert_slot`/`insert_in_slot` instead, which fuse the
    /// lookup and the insertion-slot search so a duplicate is never created.
    pub fn insert(&mut self, hash: u64, value: T, hasher: impl Fn(&T) -> u64) -> usize
    where
        A: Clone,
    {
        let mut index = self.find_insert_slot(hash);
        let old_ctrl = unsafe { *self.ctrl(index) };
        if unlikely(self.growth_left == 0 && ctrl::is_empty(old_ctrl)) {
            self.rehash_and_grow_if_necessary(&hasher);
            index = self.find_insert_slot(hash);
        }
        let old_ctrl = unsafe { *self.ctrl(index) };
        self.record_item_insert_at(index, old_ctrl, hash);
        unsafe {
            P::init(&mut *self.slot_uninit(index), value);
        }
        index
    }

    #[inline]
    fn record_item_insert_at(&mut self, index: usize, old_ctrl: i8, hash: u64) {
        self.growth_left -= ctrl::is_empty(old_ctrl) as usize;
        unsafe { self.set_ctrl_h2(index, hash) };
        self.items += 1;
    }

    /// # Safety
    /// `index` must name a currently-`Full` slot.
    pub unsafe fn erase(&mut self, index: usize) {
        unsafe {
            P::del(&mut *self.slot(index));
            self.mark_erased(index);
        }
    }

    /// Moves the value out of a `Full` slot and marks it erased, without
    /// dropping it. Used by typed façades' `remove`, which hand the value
    /// back to the caller instead of discarding it.
    ///
    /// # Safety
    /// `index` must name a currently-`Full` slot.
    pub unsafe fn remove(&mut self, index: usize) -> T {
        unsafe {
            let value = P::read(&mut *self.slot(index));
            self.mark_erased(index);
            value
        }
    }

    /// # Safety
    /// `index` must name a slot whose value was just dropped or moved out,
    /// with `items` not yet decremented.
    unsafe fn mark_erased(&mut self, index: usize) {
        self.items -= 1;

        let index_before = index.wrapping_sub(Group::WIDTH) & self.bucket_mask;
        let empty_before = unsafe { Group::load(self.ctrl(index_before)) }.match_empty();
        let empty_after = unsafe { Group::load(self.ctrl(index)) }.match_empty();

        // If the run of empties on either side of `index` spans fewer than
        // a full group, this slot was never part of an overflowing probe
        // chain and can become Empty outright; otherwise some lookup may
        // still be relying on it to keep probing, so it stays a tombstone.
        let new_ctrl = if empty_before.leading_zeros() + empty_after.trailing_zeros() < Group::WIDTH {
            self.growth_left += 1;
            ctrl::EMPTY
        } else {
            ctrl::DELETED
        };
        unsafe { self.set_ctrl(index, new_ctrl) };
    }

    /// # Safety
    /// `index` must name a currently-`Full` slot.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        unsafe { P::get(&mut *self.slot(index)) }
    }

    /// # Safety
    /// `index` must name a currently-`Full` slot.
    #[inline]
    pub unsafe fn get_mut_unchecked(&mut self, index: usize) -> &mut T {
        unsafe { P::get(&mut *self.slot(index)) }
    }

    pub fn clear(&mut self) {
        if self.is_empty_singleton() {
            return;
        }
        for index in self.full_indices() {
            unsafe { P::del(&mut *self.slot(index)) };
        }
        unsafe {
            core::ptr::write_bytes(self.ctrl.as_ptr(), ctrl::EMPTY as u8, self.buckets() + Group::WIDTH);
        }
        self.items = 0;
        self.growth_left = capacity_to_growth(self.bucket_mask);
    }

    fn full_indices(&self) -> RawIter<'_, T, P, A> {
        self.iter()
    }

    pub fn iter(&self) -> RawIter<'_, T, P, A> {
        if self.is_empty_singleton() {
            return RawIter {
                table: self,
                current_group: self.ctrl.as_ptr(),
                next_index: 0,
                group_bits: 0,
                remaining: 0,
                total_buckets: 0,
            };
        }
        let mut it = RawIter {
            table: self,
            current_group: self.ctrl.as_ptr(),
            next_index: 0,
            group_bits: 0,
            remaining: self.items,
            total_buckets: self.buckets(),
        };
        it.load_group();
        it
    }

    /// Ensures the table can hold `n` items total without growing again. If
    /// `n` does not already fit in `size + growth_left`, resizes once to
    /// `NormalizeCapacity(GrowthToLowerboundCapacity(n))` -- unlike the
    /// per-insert growth path, `reserve` never takes the rehash-in-place
    /// shortcut, since a caller asking for headroom wants an allocation
    /// sized for it, not a tombstone sweep of the old one.
    pub fn reserve(&mut self, n: usize, hasher: impl Fn(&T) -> u64)
    where
        A: Clone,
    {
        if n > self.items + self.growth_left {
            let capacity = normalize_capacity(growth_to_lower_bound_capacity(n));
            self.resize(capacity, hasher);
        }
    }

    /// Builds a table holding a clone of every entry in `self`, reserving
    /// its target capacity up front and writing each clone straight into
    /// its probed slot (bypassing `insert`'s per-item growth-budget
    /// bookkeeping, since nothing here can collide with an existing key).
    pub fn dup(&self, hasher: impl Fn(&T) -> u64) -> Self
    where
        T: Clone,
        A: Clone + Default,
    {
        let mut new_table = Self::new();
        if self.items > 0 {
            new_table.reserve(self.items, &hasher);
            for index in self.full_indices() {
                let value = unsafe { P::get(&mut *self.slot(index)).clone() };
                let hash = hasher(&value);
                let new_index = new_table.find_insert_slot(hash);
                unsafe {
                    new_table.set_ctrl_h2(new_index, hash);
                    P::init(&mut *new_table.slot_uninit(new_index), value);
                }
            }
            new_table.items = self.items;
            new_table.growth_left = capacity_to_growth(new_table.bucket_mask) - self.items;
        }
        new_table
    }

    /// Explicit capacity request: resizes to hold at least `n` items
    /// (or shrinks to fit the current `size` when `n == 0`), but never
    /// shrinks below the table's present capacity unless `n == 0`.
    /// An empty table asked to rehash down to `0` is torn down entirely.
    pub fn rehash(&mut self, n: usize, hasher: impl Fn(&T) -> u64)
    where
        A: Clone,
    {
        if n == 0 && self.items == 0 {
            log::debug!("tearing down an empty table on rehash(0)");
            unsafe { self.free_allocation_no_drop() };
            self.ctrl = NonNull::new(Group::static_empty().as_ptr() as *mut i8).unwrap();
            self.slots = NonNull::dangling();
            self.bucket_mask = 0;
            self.growth_left = 0;
            return;
        }
        let candidate = normalize_capacity(n | growth_to_lower_bound_capacity(self.items));
        if n == 0 || candidate > self.bucket_mask {
            self.resize(candidate, hasher);
        }
    }

    /// The single-item growth path taken when an insert finds no headroom
    /// left: an empty-singleton table always allocates its first slab;
    /// otherwise a table whose tombstones make up most of its slack
    /// (load factor at most 25/32) is rehashed in place instead of grown.
    fn rehash_and_grow_if_necessary(&mut self, hasher: impl Fn(&T) -> u64)
    where
        A: Clone,
    {
        if self.bucket_mask == 0 {
            log::trace!("allocating initial table");
            self.resize(1, hasher);
        } else if self.bucket_mask > Group::WIDTH && self.items * 32 <= self.bucket_mask * 25 {
            log::trace!("rehashing in place at capacity {}", self.bucket_mask);
            self.drop_deletes_without_resize(hasher);
        } else {
            log::debug!("growing table from capacity {} to {}", self.bucket_mask, self.bucket_mask * 2 + 1);
            self.resize(self.bucket_mask * 2 + 1, hasher);
        }
    }

    /// Rehashes every `Full` slot within the *same* allocation, turning
    /// `Deleted` tombstones back into `Empty` along the way. Each
    /// relocated element falls into one of three cases: it already sits in
    /// its ideal slot, its ideal slot is `Empty`, or its ideal slot is
    /// `Deleted` (swap and keep going until everything settles).
    fn drop_deletes_without_resize(&mut self, hasher: impl Fn(&T) -> u64) {
        let buckets = self.buckets();
        // Pass 1: every control byte becomes Empty (was Empty or Deleted)
        // or a fresh Deleted marker (was Full) -- Full entries are revisited
        // below and get their real h2 byte restored once rehashed.
        let mut offset = 0;
        while offset < buckets {
            unsafe {
                let group = Group::load(self.ctrl(offset));
                let converted = group.convert_special_to_empty_and_full_to_deleted();
                for (i, &byte) in converted.iter().enumerate() {
                    self.set_ctrl(offset + i, byte as i8);
                }
            }
            offset += Group::WIDTH;
        }

        for i in 0..buckets {
            if unsafe { *self.ctrl(i) } != ctrl::DELETED {
                continue;
            }
            'relocate: loop {
                let hash = hasher(unsafe { P::get(&mut *self.slot(i)) });
                let new_i = self.find_insert_slot(hash);
                if new_i == i {
                    unsafe { self.set_ctrl_h2(i, hash) };
                    break 'relocate;
                }
                let new_ctrl = unsafe { *self.ctrl(new_i) };
                if new_ctrl == ctrl::EMPTY {
                    unsafe {
                        self.set_ctrl_h2(new_i, hash);
                        let mut tmp = MaybeUninit::uninit();
                        P::transfer(&mut tmp, &mut *self.slot(i));
                        P::transfer(&mut *self.slot_uninit(new_i), &mut *tmp.as_mut_ptr());
                        self.set_ctrl(i, ctrl::EMPTY);
                    }
                    break 'relocate;
                } else {
                    debug_assert_eq!(new_ctrl, ctrl::DELETED);
                    unsafe {
                        self.set_ctrl_h2(new_i, hash);
                        let mut tmp = MaybeUninit::uninit();
                        P::transfer(&mut tmp, &mut *self.slot(i));
                        P::transfer(
                            &mut *self.slot_uninit(i),
                            &mut *self.slot(new_i),
                        );
                        P::transfer(&mut *self.slot_uninit(new_i), &mut *tmp.as_mut_ptr());
                    }
                    // The element now sitting at `i` still needs checking.
                    continue 'relocate;
                }
            }
        }
        self.growth_left = capacity_to_growth(self.bucket_mask) - self.items;
    }

    /// Allocates a table of `new_capacity` and moves every `Full` slot into
    /// it, guarded so a panicking `hasher` leaves neither allocation
    /// double-freed nor values double-dropped.
    fn resize(&mut self, new_capacity: usize, hasher: impl Fn(&T) -> u64)
    where
        A: Clone,
    {
        debug_assert!(crate::capacity::is_valid_capacity(new_capacity) || new_capacity == 0);
        let mut new_table: RawTable<T, P, A> = unsafe { Self::new_uninitialized(new_capacity, self.alloc.clone()) };

        if !self.is_empty_singleton() {
            let mut guard = guard(&mut new_table, |t| unsafe { t.free_allocation() });
            for index in self.full_indices() {
                let hash = hasher(unsafe { P::get(&mut *self.slot(index)) });
                let new_index = guard.find_insert_slot(hash);
                unsafe {
                    guard.set_ctrl_h2(new_index, hash);
                    P::transfer(
                        &mut *guard.slot_uninit(new_index),
                        &mut *self.slot(index),
                    );
                }
            }
            guard.items = self.items;
            guard.growth_left = capacity_to_growth(guard.bucket_mask) - guard.items;
            mem::forget(guard);
        } else {
            new_table.items = self.items;
            new_table.growth_left = capacity_to_growth(new_table.bucket_mask);
        }

        // The old allocation's slots were all moved-from above (or it held
        // nothing); free its bytes without running `Drop` a second time,
        // then overwrite `self` without dropping the stale pointers it
        // still holds (`ptr::write`, not assignment).
        unsafe {
            self.free_allocation_no_drop();
            core::ptr::write(self, new_table);
        }
    }

    /// # Safety
    /// Caller must not read any slot or rely on control bytes until the
    /// table is fully populated; every byte is `Empty` and `items`/
    /// `growth_left` are left at `0`.
    unsafe fn new_uninitialized(capacity: usize, alloc: A) -> Self
    where
        A: RawAlloc,
    {
        if capacity == 0 {
            return RawTable {
                ctrl: NonNull::new(Group::static_empty().as_ptr() as *mut i8).unwrap(),
                slots: NonNull::dangling(),
                bucket_mask: 0,
                growth_left: 0,
                items: 0,
                alloc,
                _marker: PhantomData,
            };
        }
        let layout = TableLayout::new(mem::size_of::<P::Slot>(), mem::align_of::<P::Slot>(), capacity);
        let base = alloc
            .alloc(layout.alloc_layout())
            .unwrap_or_else(|| alloc_error(layout.alloc_layout()));
        let ctrl = NonNull::new(base.as_ptr()).unwrap();
        unsafe { core::ptr::write_bytes(ctrl.as_ptr(), ctrl::EMPTY as u8, capacity + 1 + Group::WIDTH) };
        unsafe { *ctrl.as_ptr().add(capacity) = ctrl::SENTINEL };
        let slots = NonNull::new(base.as_ptr().add(layout.slot_offset).cast::<P::Slot>()).unwrap();
        RawTable {
            ctrl: ctrl.cast(),
            slots,
            bucket_mask: capacity,
            growth_left: 0,
            items: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    unsafe fn free_allocation(&mut self) {
        if self.is_empty_singleton() {
            return;
        }
        for index in self.full_indices() {
            unsafe { P::del(&mut *self.slot(index)) };
        }
        unsafe { self.free_allocation_no_drop() };
    }

    unsafe fn free_allocation_no_drop(&mut self) {
        if self.is_empty_singleton() {
            return;
        }
        let layout = TableLayout::new(mem::size_of::<P::Slot>(), mem::align_of::<P::Slot>(), self.bucket_mask);
        unsafe {
            self.alloc
                .dealloc(NonNull::new_unchecked(self.ctrl.as_ptr() as *mut u8), layout.alloc_layout());
        }
    }
}

impl<T, P: SlotPolicy<T>, A: RawAlloc> Drop for RawTable<T, P, A> {
    fn drop(&mut self) {
        unsafe { self.free_allocation() }
    }
}

#[cold]
fn alloc_error(layout: core::alloc::Layout) -> ! {
    log::error!("allocation of {} bytes failed", layout.size());
    panic!("skymap: allocation of {} bytes failed", layout.size());
}

/// Walks every `Full` control byte in storage order (not insertion order;
/// see the crate's Non-goals), one `Group::WIDTH`-sized window at a time.
pub struct RawIter<'a, T, P: SlotPolicy<T>, A: RawAlloc> {
    table: &'a RawTable<T, P, A>,
    current_group: *const i8,
    next_index: usize,
    group_bits: u64,
    remaining: usize,
    total_buckets: usize,
}

impl<'a, T, P: SlotPolicy<T>, A: RawAlloc> RawIter<'a, T, P, A> {
    fn load_group(&mut self) {
        if self.next_index >= self.total_buckets {
            self.group_bits = 0;
            return;
        }
        let group = unsafe { Group::load(self.table.ctrl(self.next_index)) };
        self.current_group = unsafe { self.table.ctrl(self.next_index) };
        self.group_bits = group.match_full().iter().fold(0u64, |acc, bit| acc | (1 << bit));
    }
}

impl<'a, T, P: SlotPolicy<T>, A: RawAlloc> Iterator for RawIter<'a, T, P, A> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if self.group_bits != 0 {
                let bit = self.group_bits.trailing_zeros() as usize;
                self.group_bits &= self.group_bits - 1;
                self.remaining -= 1;
                let _ = self.current_group;
                return Some(self.next_index + bit);
            }
            self.next_index += Group::WIDTH;
            if self.next_index >= self.total_buckets {
                return None;
            }
            self.load_group();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, P: SlotPolicy<T>, A: RawAlloc> ExactSizeIterator for RawIter<'a, T, P, A> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FlatSlot;

    fn hash_u64(x: &u64) -> u64 {
        use crate::hash::FxBuildHasher;
        use core::hash::{BuildHasher, Hasher};
        let mut h = FxBuildHasher.build_hasher();
        h.write_u64(*x);
        h.finish()
    }

    #[test]
    fn insert_and_find_roundtrip() {
        let mut table: RawTable<u64, FlatSlot<u64>> = RawTable::new();
        for i in 0..100u64 {
            table.insert(hash_u64(&i), i, hash_u64);
        }
        assert_eq!(table.len(), 100);
        for i in 0..100u64 {
            let idx = table.find(hash_u64(&i), |v| *v == i);
            assert!(idx.is_some(), "missing {i}");
        }
        assert!(table.find(hash_u64(&12345), |v| *v == 12345).is_none());
    }

    #[test]
    fn find_or_find_insert_slot_never_duplicates_a_hit() {
        let mut table: RawTable<u64, FlatSlot<u64>> = RawTable::new();
        for i in 0..50u64 {
            match table.find_or_find_insert_slot(hash_u64(&i), |v| *v == i, hash_u64) {
                Ok(_) => panic!("{i} should not exist yet"),
                Err(slot) => {
                    unsafe { table.insert_in_slot(slot, hash_u64(&i), i) };
                }
            }
        }
        assert_eq!(table.len(), 50);
        for i in 0..50u64 {
            match table.find_or_find_insert_slot(hash_u64(&i), |v| *v == i, hash_u64) {
                Ok(idx) => assert_eq!(unsafe { *table.get_unchecked(idx) }, i),
                Err(_) => panic!("{i} should already exist"),
            }
        }
        assert_eq!(table.len(), 50, "a hit must never insert");
    }

    #[test]
    fn erase_then_reinsert_reuses_tombstone() {
        let mut table: RawTable<u64, FlatSlot<u64>> = RawTable::new();
        for i in 0..20u64 {
            table.insert(hash_u64(&i), i, hash_u64);
        }
        for i in 0..10u64 {
            let idx = table.find(hash_u64(&i), |v| *v == i).unwrap();
            unsafe { table.erase(idx) };
        }
        assert_eq!(table.len(), 10);
        for i in 100..110u64 {
            table.insert(hash_u64(&i), i, hash_u64);
        }
        assert_eq!(table.len(), 20);
        for i in 10..20u64 {
            assert!(table.find(hash_u64(&i), |v| *v == i).is_some());
        }
        for i in 100..110u64 {
            assert!(table.find(hash_u64(&i), |v| *v == i).is_some());
        }
    }

    #[test]
    fn iter_visits_every_item_exactly_once() {
        let mut table: RawTable<u64, FlatSlot<u64>> = RawTable::new();
        let mut expected = std::collections::HashSet::new();
        for i in 0..250u64 {
            table.insert(hash_u64(&i), i, hash_u64);
            expected.insert(i);
        }
        let mut seen = std::collections::HashSet::new();
        for idx in table.iter() {
            let val = unsafe { *FlatSlot::<u64>::get(&mut *table.slot(idx)) };
            assert!(seen.insert(val), "duplicate {val}");
        }
        assert_eq!(seen, expected);
    }

    #[test]
    fn clear_drops_everything_and_resets_len() {
        let mut table: RawTable<u64, FlatSlot<u64>> = RawTable::new();
        for i in 0..30u64 {
            table.insert(hash_u64(&i), i, hash_u64);
        }
        table.clear();
        assert_eq!(table.len(), 0);
        assert!(table.find(hash_u64(&5), |v| *v == 5).is_none());
    }

    #[test]
    fn dup_produces_an_independent_copy() {
        let mut table: RawTable<u64, FlatSlot<u64>> = RawTable::new();
        for i in 0..100u64 {
            table.insert(hash_u64(&i), i, hash_u64);
        }
        let mut copy = table.dup(hash_u64);
        assert_eq!(copy.len(), table.len());
        for i in 0..100u64 {
            assert!(copy.find(hash_u64(&i), |v| *v == i).is_some());
        }
        let idx = copy.find(hash_u64(&0), |v| *v == 0).unwrap();
        unsafe { copy.erase(idx) };
        assert!(copy.find(hash_u64(&0), |v| *v == 0).is_none());
        assert!(table.find(hash_u64(&0), |v| *v == 0).is_some());
    }

    #[test]
    fn rehash_to_zero_tears_down_an_empty_table() {
        let mut table: RawTable<u64, FlatSlot<u64>> = RawTable::new();
        for i in 0..20u64 {
            table.insert(hash_u64(&i), i, hash_u64);
        }
        for i in 0..20u64 {
            let idx = table.find(hash_u64(&i), |v| *v == i).unwrap();
            unsafe { table.erase(idx) };
        }
        assert!(table.capacity() > 0);
        table.rehash(0, hash_u64);
        assert_eq!(table.capacity(), 0);
        table.insert(hash_u64(&7), 7, hash_u64);
        assert!(table.find(hash_u64(&7), |v| *v == 7).is_some());
    }

    #[test]
    fn rehash_in_place_reclaims_tombstones_without_growing() {
        let mut table: RawTable<u64, FlatSlot<u64>> = RawTable::with_capacity(63);
        let capacity_before = table.capacity();
        for i in 0..63u64 {
            table.insert(hash_u64(&i), i, hash_u64);
        }
        for i in 0..32u64 {
            let idx = table.find(hash_u64(&i), |v| *v == i).unwrap();
            unsafe { table.erase(idx) };
        }
        for i in 1000..1031u64 {
            table.insert(hash_u64(&i), i, hash_u64);
        }
        assert_eq!(table.capacity(), capacity_before);
        assert_eq!(table.len(), 64);
        for i in 32..63u64 {
            assert!(table.find(hash_u64(&i), |v| *v == i).is_some());
        }
        for i in 1000..1031u64 {
            assert!(table.find(hash_u64(&i), |v| *v == i).is_some());
        }
    }
}
