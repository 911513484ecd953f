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

//! Allocator abstraction for the table's single control+slot allocation.
//!
//! Mirrors the teacher's `mapalloc.rs`: an unsafe trait so callers can plug
//! in an arena or pool allocator, plus a `Global` implementation wired to
//! `std::alloc` for the common case.

use core::alloc::Layout;
use core::ptr::NonNull;

/// # Safety
/// `alloc`/`alloc_zeroed` must return a pointer valid for `layout`, or null
/// on failure; `dealloc` must accept exactly the layout a prior `alloc`
/// call on `self` used.
pub unsafe trait RawAlloc {
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>>;
    fn alloc_zeroed(&self, layout: Layout) -> Option<NonNull<u8>>;
    /// # Safety
    /// `ptr` must have been returned by `alloc`/`alloc_zeroed` on `self`
    /// with the same `layout`.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout);
}

#[derive(Clone, Copy, Default, Debug)]
pub struct Global;

#[cfg(feature = "std")]
unsafe impl RawAlloc for Global {
    #[inline]
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return NonNull::new(layout.align() as *mut u8);
        }
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    #[inline]
    fn alloc_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return NonNull::new(layout.align() as *mut u8);
        }
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_zeroed_is_actually_zero() {
        let layout = Layout::from_size_align(64, 8).unwrap();
        let ptr = Global.alloc_zeroed(layout).unwrap();
        unsafe {
            let slice = core::slice::from_raw_parts(ptr.as_ptr(), 64);
            assert!(slice.iter().all(|&b| b == 0));
            Global.dealloc(ptr, layout);
        }
    }
}
