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

//! Hand-written error types, no `thiserror`: a fallible reserve can only
//! fail because the allocator said no, or because the requested capacity
//! doesn't fit in a `usize`-addressable layout.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TryReserveError {
    /// The computed `Layout` for the requested capacity overflowed.
    CapacityOverflow,
    /// The allocator returned null.
    AllocError { layout_size: usize, layout_align: usize },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryReserveError::CapacityOverflow => {
                write!(f, "requested capacity exceeds the table's addressable limit")
            }
            TryReserveError::AllocError { layout_size, layout_align } => write!(
                f,
                "allocator failed to provide {layout_size} bytes (align {layout_align})"
            ),
        }
    }
}

impl std::error::Error for TryReserveError {}
