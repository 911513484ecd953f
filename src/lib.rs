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

//! `skymap` is a SwissTable-style open-addressed hash table: control-byte
//! metadata scanned a `Group` at a time (SSE2 where the target has it, a
//! SWAR bit trick everywhere else), triangular probing, and a 7/8 max load
//! factor with in-place tombstone cleanup before a table pays for a grow.
//!
//! [`SkyMap`] and [`SkySet`] are the typed façades most callers want;
//! [`raw::RawTable`] is the engine underneath, generic over how a slot
//! stores its value ([`policy::SlotPolicy`]) and over its allocator
//! ([`alloc::RawAlloc`]), for callers who need a map/set-shaped thing this
//! crate doesn't already provide.
//!
//! This crate makes no promises about iteration order, is not thread-safe,
//! and does not persist to disk: see each module's own docs for the
//! specifics it does guarantee.

pub mod alloc;
pub mod bitmask;
pub mod capacity;
pub mod ctrl;
pub mod entry;
pub mod error;
pub mod group;
pub mod hash;
pub mod map;
pub mod policy;
pub mod probe;
pub mod raw;
pub mod scopeguard;
pub mod set;
mod util;

pub use entry::{Entry, OccupiedEntry, VacantEntry};
pub use error::TryReserveError;
pub use hash::FxBuildHasher;
pub use map::SkyMap;
pub use set::SkySet;
