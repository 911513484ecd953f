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

//! End-to-end scenarios over the typed façades, with integer keys and the
//! crate's default hasher.

use skymap::SkySet;
use std::collections::HashSet;

#[test]
fn s1_basic_insert_contains_erase() {
    let mut t: SkySet<u32> = SkySet::new();
    assert!(t.insert(1));
    assert!(t.insert(2));
    assert!(t.insert(3));
    assert_eq!(t.len(), 3);
    assert!(t.contains(&2));
    assert!(t.remove(&2));
    assert_eq!(t.len(), 2);
    assert!(!t.contains(&2));
}

#[test]
fn s2_grow_past_one_hundred_items() {
    let mut t: SkySet<u32> = SkySet::new();
    for i in 0..100u32 {
        t.insert(i);
    }
    assert_eq!(t.len(), 100);
    assert!(t.capacity() >= 127);
    for i in 0..100u32 {
        assert!(t.contains(&i), "missing {i}");
    }
    assert!(!t.contains(&100));
}

#[test]
fn s4_iterate_after_growth_yields_exactly_the_inserted_set() {
    let mut t: SkySet<u32> = SkySet::new();
    for i in 0..100u32 {
        t.insert(i);
    }
    let seen: HashSet<u32> = t.iter().copied().collect();
    let expected: HashSet<u32> = (0..100u32).collect();
    assert_eq!(seen, expected);
}

#[test]
fn s5_dup_is_independent_of_the_original() {
    let mut t: SkySet<u32> = SkySet::new();
    for i in 0..100u32 {
        t.insert(i);
    }
    let mut u = t.clone();
    for k in 0..120u32 {
        assert_eq!(u.contains(&k), t.contains(&k), "mismatch at {k}");
    }
    u.insert(100);
    u.remove(&0);
    assert!(t.contains(&0));
    assert!(!t.contains(&100));
}

#[test]
fn s6_clear_resets_size_and_allows_reinsertion() {
    let mut t: SkySet<u32> = SkySet::new();
    for i in 0..100u32 {
        t.insert(i);
    }
    t.clear();
    assert_eq!(t.len(), 0);
    assert!(t.insert(0));
    let seen: HashSet<u32> = t.iter().copied().collect();
    assert_eq!(seen, HashSet::from([0]));
}
