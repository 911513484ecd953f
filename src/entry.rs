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

//! The `Entry` API: look up a key once, then decide whether to insert or
//! update, without a second hash and probe. Not part of the core engine —
//! `cwisstable`'s `map_api.h` exposes the same lookup-then-decide shape on
//! top of its raw set, and every Rust map type offers it.

use crate::map::SkyMap;
use crate::raw::InsertSlot;
use core::hash::{BuildHasher, Hash};

pub enum Entry<'a, K, V, S> {
    Occupied(OccupiedEntry<'a, K, V, S>),
    Vacant(VacantEntry<'a, K, V, S>),
}

pub struct OccupiedEntry<'a, K, V, S> {
    map: &'a mut SkyMap<K, V, S>,
    index: usize,
}

pub struct VacantEntry<'a, K, V, S> {
    map: &'a mut SkyMap<K, V, S>,
    key: K,
    hash: u64,
    slot: InsertSlot,
}

impl<'a, K: Hash + Eq, V, S: BuildHasher> Entry<'a, K, V, S> {
    /// A single probe walk serves both branches: `find_or_find_insert_slot`
    /// either locates the existing pair or reserves (and budgets) the slot
    /// a later `VacantEntry::insert` writes into, so a hit and an insert can
    /// never race into the same key.
    pub(crate) fn new(map: &'a mut SkyMap<K, V, S>, key: K) -> Self {
        let hash = map.hash_builder().hash_one(&key);
        let hash_builder_ptr = map.hash_builder() as *const S;
        match map.table_mut().find_or_find_insert_slot(hash, |(k, _)| *k == key, |(k, _)| {
            unsafe { &*hash_builder_ptr }.hash_one(k)
        }) {
            Ok(index) => Entry::Occupied(OccupiedEntry { map, index }),
            Err(slot) => Entry::Vacant(VacantEntry { map, key, hash, slot }),
        }
    }

    pub fn or_insert(self, default: V) -> &'a mut V {
        self.or_insert_with(|| default)
    }

    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(default()),
        }
    }

    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut e) => {
                f(e.get_mut());
                Entry::Occupied(e)
            }
            Entry::Vacant(e) => Entry::Vacant(e),
        }
    }

    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(e) => &e.get_pair().0,
            Entry::Vacant(e) => &e.key,
        }
    }
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S> {
    fn get_pair(&self) -> &(K, V) {
        unsafe { self.map.table_ref().get_unchecked(self.index) }
    }

    pub fn get(&self) -> &V {
        &self.get_pair().1
    }

    pub fn get_mut(&mut self) -> &mut V {
        let index = self.index;
        &mut unsafe { self.map.table_mut().get_mut_unchecked(index) }.1
    }

    pub fn into_mut(self) -> &'a mut V {
        let index = self.index;
        &mut unsafe { self.map.table_mut().get_mut_unchecked(index) }.1
    }

    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    pub fn remove(self) -> V {
        let (_, v) = unsafe { self.map.table_mut().remove(self.index) };
        v
    }
}

impl<'a, K, V, S: BuildHasher> VacantEntry<'a, K, V, S>
where
    K: Hash + Eq,
{
    pub fn insert(self, value: V) -> &'a mut V {
        let hash = self.hash;
        let index = unsafe { self.map.table_mut().insert_in_slot(self.slot, hash, (self.key, value)) };
        &mut unsafe { self.map.table_mut().get_mut_unchecked(index) }.1
    }
}
