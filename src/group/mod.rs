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

//! Selects the SIMD or SWAR group-scanning backend for the host target.
//!
//! A `Group` loads `Group::WIDTH` control bytes from an aligned-enough
//! pointer and answers which lanes match a byte or a predicate (`Empty`,
//! `Empty or Deleted`, `Full`) as a [`crate::bitmask::BitMask`]. Every public
//! operation here is either `const`/safe or documents its pointer contract;
//! callers in `probe.rs`/`raw.rs` are the ones that must uphold it.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(all(
        any(target_arch = "x86", target_arch = "x86_64"),
        target_feature = "sse2",
        not(miri),
    ))] {
        mod sse2;
        pub use sse2::Group;
    } else {
        mod generic;
        pub use generic::Group;
    }
}
