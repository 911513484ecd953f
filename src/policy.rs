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

//! The policy traits `RawTable` is generic over, replacing the C original's
//! callback-struct `Policy` with compile-time monomorphization: one trait
//! for hashing/equality, one for how a slot stores its value.

use core::mem::MaybeUninit;
use core::ptr::NonNull;

/// How to hash and compare the values a table stores.
pub trait KeyPolicy<T: ?Sized> {
    fn hash(&self, val: &T) -> u64;
    fn eq(&self, a: &T, b: &T) -> bool;
}

/// How a table's slot array stores `T`: in place (`FlatSlot`) or behind an
/// indirection (`BoxSlot`). `RawTable` never looks at `T` directly outside
/// these calls, so a `SlotPolicy` can give slots a different representation
/// than the logical value type.
///
/// # Safety
/// `get` must return a reference to a live, initialized `T` for any slot
/// that was `init`-ed and not yet `del`-eted. `transfer` must leave `src`
/// in a state `del` can still safely run on (or that is never `del`-ed
/// again, for flat moves).
pub unsafe trait SlotPolicy<T> {
    type Slot;

    /// Writes an initial value into a freshly-claimed slot.
    fn init(slot: &mut MaybeUninit<Self::Slot>, val: T);

    /// Drops whatever `init` wrote into this slot.
    ///
    /// # Safety
    /// `slot` must be initialized and not already `del`-eted.
    unsafe fn del(slot: &mut Self::Slot);

    /// Moves a slot's contents into a new, uninitialized slot (used during
    /// resize/rehash). Does not drop `src`.
    ///
    /// # Safety
    /// `src` must be initialized; `dst` must be uninitialized.
    unsafe fn transfer(dst: &mut MaybeUninit<Self::Slot>, src: &mut Self::Slot);

    /// Borrows the logical value out of an initialized slot.
    ///
    /// # Safety
    /// `slot` must be initialized and not already `del`-eted.
    unsafe fn get(slot: &mut Self::Slot) -> &mut T;

    /// Moves the logical value out of a slot without dropping anything;
    /// the caller takes over `T`'s lifetime and must not call `del` on
    /// this slot afterwards.
    ///
    /// # Safety
    /// `slot` must be initialized and not already `del`-eted or `read`.
    unsafe fn read(slot: &mut Self::Slot) -> T;
}

/// Stores `T` directly in the slot array; `get` is the identity, `transfer`
/// is a non-overlapping bitwise copy. The right choice whenever pointers
/// into the table are never held across a mutation, which this crate's
/// Non-goals guarantee.
pub struct FlatSlot<T>(core::marker::PhantomData<T>);

unsafe impl<T> SlotPolicy<T> for FlatSlot<T> {
    type Slot = T;

    #[inline]
    fn init(slot: &mut MaybeUninit<T>, val: T) {
        slot.write(val);
    }

    #[inline]
    unsafe fn del(slot: &mut T) {
        unsafe { core::ptr::drop_in_place(slot) }
    }

    #[inline]
    unsafe fn transfer(dst: &mut MaybeUninit<T>, src: &mut T) {
        unsafe { core::ptr::copy_nonoverlapping(src as *const T, dst.as_mut_ptr(), 1) }
    }

    #[inline]
    unsafe fn get(slot: &mut T) -> &mut T {
        slot
    }

    #[inline]
    unsafe fn read(slot: &mut T) -> T {
        unsafe { core::ptr::read(slot) }
    }
}

/// Stores `T` behind an owned heap pointer; useful when `T` is large enough
/// that moving whole slots during rehash is costlier than moving a pointer.
pub struct BoxSlot<T>(core::marker::PhantomData<T>);

unsafe impl<T> SlotPolicy<T> for BoxSlot<T> {
    type Slot = NonNull<T>;

    #[inline]
    fn init(slot: &mut MaybeUninit<NonNull<T>>, val: T) {
        let boxed = Box::new(val);
        slot.write(NonNull::from(Box::leak(boxed)));
    }

    #[inline]
    unsafe fn del(slot: &mut NonNull<T>) {
        unsafe { drop(Box::from_raw(slot.as_ptr())) }
    }

    #[inline]
    unsafe fn transfer(dst: &mut MaybeUninit<NonNull<T>>, src: &mut NonNull<T>) {
        dst.write(*src);
    }

    #[inline]
    unsafe fn get(slot: &mut NonNull<T>) -> &mut T {
        unsafe { slot.as_mut() }
    }

    #[inline]
    unsafe fn read(slot: &mut NonNull<T>) -> T {
        unsafe { *Box::from_raw(slot.as_ptr()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_slot_round_trips_a_value() {
        let mut slot: MaybeUninit<u64> = MaybeUninit::uninit();
        FlatSlot::<u64>::init(&mut slot, 42);
        let mut inited = unsafe { slot.assume_init() };
        let got = unsafe { FlatSlot::<u64>::get(&mut inited) };
        assert_eq!(*got, 42);
        unsafe { FlatSlot::<u64>::del(&mut inited) };
    }

    #[test]
    fn box_slot_round_trips_a_value() {
        let mut slot: MaybeUninit<NonNull<String>> = MaybeUninit::uninit();
        BoxSlot::<String>::init(&mut slot, "hello".to_string());
        let mut inited = unsafe { slot.assume_init() };
        let got = unsafe { BoxSlot::<String>::get(&mut inited) };
        assert_eq!(got, "hello");
        unsafe { BoxSlot::<String>::del(&mut inited) };
    }
}
