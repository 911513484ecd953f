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

//! `SkyMap<K, V, S>`: a typed hash map built on [`crate::raw::RawTable`].

use crate::entry::Entry;
use crate::hash::FxBuildHasher;
use crate::policy::FlatSlot;
use crate::raw::{RawIter, RawTable};

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};

pub struct SkyMap<K, V, S = FxBuildHasher> {
    table: RawTable<(K, V), FlatSlot<(K, V)>>,
    hash_builder: S,
}

impl<K, V> SkyMap<K, V, FxBuildHasher> {
    #[inline]
    pub fn new() -> Self {
        Self::with_hasher(FxBuildHasher)
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, FxBuildHasher)
    }
}

impl<K, V> Default for SkyMap<K, V, FxBuildHasher> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S: BuildHasher> SkyMap<K, V, S> {
    #[inline]
    pub fn with_hasher(hash_builder: S) -> Self {
        SkyMap { table: RawTable::new(), hash_builder }
    }

    #[inline]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        SkyMap { table: RawTable::with_capacity(capacity), hash_builder }
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

    #[inline]
    pub fn reserve(&mut self, additional: usize)
    where
        K: Hash,
    {
        let target = self.table.len() + additional;
        let hash_builder = &self.hash_builder;
        self.table
            .reserve(target, |(k, _)| Self::hash_key(hash_builder, k));
    }

    /// Resizes to hold at least `n` items, or shrinks the allocation to fit
    /// the current length when `n == 0`; never shrinks below the present
    /// capacity otherwise.
    pub fn rehash(&mut self, n: usize)
    where
        K: Hash,
    {
        let hash_builder = &self.hash_builder;
        self.table
            .rehash(n, |(k, _)| Self::hash_key(hash_builder, k));
    }

    #[inline]
    fn hash_key<Q>(hash_builder: &S, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        hash_builder.hash_one(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V>
    where
        K: Hash + Eq,
    {
        let hash = Self::hash_key(&self.hash_builder, &key);
        let hash_builder = &self.hash_builder;
        match self.table.find_or_find_insert_slot(
            hash,
            |(k, _)| *k == key,
            |(k, _)| Self::hash_key(hash_builder, k),
        ) {
            Ok(index) => {
                let slot = unsafe { self.table.get_mut_unchecked(index) };
                Some(core::mem::replace(&mut slot.1, value))
            }
            Err(slot) => {
                unsafe { self.table.insert_in_slot(slot, hash, (key, value)) };
                None
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = Self::hash_key(&self.hash_builder, key);
        self.table
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|index| &unsafe { self.table.get_unchecked(index) }.1)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = Self::hash_key(&self.hash_builder, key);
        let index = self.table.find(hash, |(k, _)| k.borrow() == key)?;
        Some(&mut unsafe { self.table.get_mut_unchecked(index) }.1)
    }

    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = Self::hash_key(&self.hash_builder, key);
        let index = self.table.find(hash, |(k, _)| k.borrow() == key)?;
        let (_, v) = unsafe { self.table.remove(index) };
        Some(v)
    }

    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S>
    where
        K: Hash + Eq,
    {
        Entry::new(self, key)
    }

    #[inline]
    pub(crate) fn hash_builder(&self) -> &S {
        &self.hash_builder
    }

    #[inline]
    pub(crate) fn table_mut(&mut self) -> &mut RawTable<(K, V), FlatSlot<(K, V)>> {
        &mut self.table
    }

    #[inline]
    pub(crate) fn table_ref(&self) -> &RawTable<(K, V), FlatSlot<(K, V)>> {
        &self.table
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { inner: self.table.iter(), table: &self.table }
    }
}

/// Lending over `&(K, V)` pairs in storage order; see the crate's
/// Non-goals for why that order carries no meaning across mutation.
pub struct Iter<'a, K, V> {
    inner: RawIter<'a, (K, V), FlatSlot<(K, V)>, crate::alloc::Global>,
    table: &'a RawTable<(K, V), FlatSlot<(K, V)>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.inner.next()?;
        let (k, v) = unsafe { self.table.get_unchecked(index) };
        Some((k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Clone, V: Clone, S: BuildHasher + Clone> Clone for SkyMap<K, V, S> {
    /// Independent of `self`: every key/value pair is cloned into a
    /// freshly probed table, so mutating the copy never touches the
    /// original's allocation.
    fn clone(&self) -> Self {
        let hash_builder = self.hash_builder.clone();
        let table = self.table.dup(|(k, _)| hash_builder.hash_one(k));
        SkyMap { table, hash_builder }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S: BuildHasher> fmt::Debug for SkyMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove_roundtrip() {
        let mut map: SkyMap<String, u32> = SkyMap::new();
        assert_eq!(map.insert("a".into(), 1), None);
        assert_eq!(map.insert("b".into(), 2), None);
        assert_eq!(map.insert("a".into(), 10), Some(1));
        assert_eq!(map.get("a"), Some(&10));
        assert_eq!(map.get("missing"), None);
        assert_eq!(map.remove("b"), Some(2));
        assert_eq!(map.remove("b"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn iterates_every_inserted_pair() {
        let mut map: SkyMap<u32, u32> = SkyMap::new();
        for i in 0..64 {
            map.insert(i, i * 2);
        }
        let mut seen: Vec<(u32, u32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        seen.sort();
        let expected: Vec<(u32, u32)> = (0..64).map(|i| (i, i * 2)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn grows_past_many_insertions_and_removals() {
        let mut map: SkyMap<u32, u32> = SkyMap::new();
        for round in 0..5 {
            for i in 0..200 {
                map.insert(round * 1000 + i, i);
            }
            for i in 0..100 {
                map.remove(&(round * 1000 + i));
            }
        }
        assert_eq!(map.len(), 5 * 100);
    }

    #[test]
    fn clone_is_independent_of_the_original() {
        let mut map: SkyMap<u32, u32> = SkyMap::new();
        for i in 0..100 {
            map.insert(i, i);
        }
        let mut cloned = map.clone();
        for i in 0..100 {
            assert_eq!(cloned.get(&i), Some(&i));
        }
        cloned.insert(100, 100);
        cloned.remove(&0);
        assert_eq!(map.len(), 100);
        assert_eq!(map.get(&0), Some(&0));
        assert_eq!(cloned.get(&0), None);
    }

    #[test]
    fn rehash_to_zero_shrinks_an_empty_map() {
        let mut map: SkyMap<u32, u32> = SkyMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        for i in 0..10 {
            map.insert(i, i);
        }
        for i in 0..10 {
            map.remove(&i);
        }
        map.rehash(0);
        assert_eq!(map.capacity(), 0);
        assert_eq!(map.len(), 0);
        map.insert(0, 0);
        assert_eq!(map.get(&0), Some(&0));
    }
}
