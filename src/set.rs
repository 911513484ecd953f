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

//! `SkySet<T, S>`: a typed hash set built on [`crate::raw::RawTable`].

use crate::hash::FxBuildHasher;
use crate::policy::FlatSlot;
use crate::raw::{RawIter, RawTable};

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};

pub struct SkySet<T, S = FxBuildHasher> {
    table: RawTable<T, FlatSlot<T>>,
    hash_builder: S,
}

impl<T> SkySet<T, FxBuildHasher> {
    #[inline]
    pub fn new() -> Self {
        Self::with_hasher(FxBuildHasher)
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, FxBuildHasher)
    }
}

impl<T> Default for SkySet<T, FxBuildHasher> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S: BuildHasher> SkySet<T, S> {
    #[inline]
    pub fn with_hasher(hash_builder: S) -> Self {
        SkySet { table: RawTable::new(), hash_builder }
    }

    #[inline]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        SkySet { table: RawTable::with_capacity(capacity), hash_builder }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.table.clear()
    }

    /// Ensures room for `additional` more values without growing again.
    pub fn reserve(&mut self, additional: usize)
    where
        T: Hash,
    {
        let target = self.table.len() + additional;
        let hash_builder = &self.hash_builder;
        self.table.reserve(target, |v| Self::hash_key(hash_builder, v));
    }

    /// Resizes to hold at least `n` values, or shrinks to fit the current
    /// length when `n == 0`.
    pub fn rehash(&mut self, n: usize)
    where
        T: Hash,
    {
        let hash_builder = &self.hash_builder;
        self.table.rehash(n, |v| Self::hash_key(hash_builder, v));
    }

    #[inline]
    fn hash_key<Q>(hash_builder: &S, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        hash_builder.hash_one(key)
    }

    /// Inserts `value`; returns `true` if it was newly inserted, `false` if
    /// an equal value was already present (the existing value is kept,
    /// matching `std::collections::HashSet`).
    pub fn insert(&mut self, value: T) -> bool
    where
        T: Hash + Eq,
    {
        let hash = Self::hash_key(&self.hash_builder, &value);
        let hash_builder = &self.hash_builder;
        match self
            .table
            .find_or_find_insert_slot(hash, |v| *v == value, |v| Self::hash_key(hash_builder, v))
        {
            Ok(_) => false,
            Err(slot) => {
                unsafe { self.table.insert_in_slot(slot, hash, value) };
                true
            }
        }
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = Self::hash_key(&self.hash_builder, value);
        self.table.find(hash, |v| v.borrow() == value).is_some()
    }

    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = Self::hash_key(&self.hash_builder, value);
        match self.table.find(hash, |v| v.borrow() == value) {
            Some(index) => {
                unsafe { self.table.erase(index) };
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter { inner: self.table.iter(), table: &self.table }
    }
}

pub struct Iter<'a, T> {
    inner: RawIter<'a, T, FlatSlot<T>, crate::alloc::Global>,
    table: &'a RawTable<T, FlatSlot<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.inner.next()?;
        Some(unsafe { self.table.get_unchecked(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: Clone + Hash, S: BuildHasher + Clone> Clone for SkySet<T, S> {
    fn clone(&self) -> Self {
        let hash_builder = self.hash_builder.clone();
        let table = self.table.dup(|v| hash_builder.hash_one(v));
        SkySet { table, hash_builder }
    }
}

impl<T: fmt::Debug, S: BuildHasher> fmt::Debug for SkySet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
