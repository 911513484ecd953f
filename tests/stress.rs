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

//! Randomized checks of the invariants described in the crate's testable
//! properties, run against a `HashSet` oracle with deterministically
//! seeded sequences so a failure always reproduces.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skymap::raw::RawTable;
use skymap::SkySet;
use std::collections::HashSet;

fn hash_u64(x: &u64) -> u64 {
    use skymap::FxBuildHasher;
    use std::hash::{BuildHasher, Hasher};
    let mut h = FxBuildHasher.build_hasher();
    h.write_u64(*x);
    h.finish()
}

/// Count agreement + growth budget: `len()` always equals the oracle's
/// size, and capacity is never exceeded by it.
#[test]
fn count_and_growth_budget_hold_across_a_random_sequence() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut table: SkySet<u32> = SkySet::new();
    let mut oracle: HashSet<u32> = HashSet::new();

    for _ in 0..5000 {
        let key: u32 = rng.gen_range(0..2000);
        if rng.gen_bool(0.6) {
            let inserted = table.insert(key);
            assert_eq!(inserted, oracle.insert(key));
        } else {
            let removed = table.remove(&key);
            assert_eq!(removed, oracle.remove(&key));
        }
        assert_eq!(table.len(), oracle.len());
        assert!(table.len() <= table.capacity());
    }
}

/// Find correctness: every key the oracle has is found, every key it
/// doesn't have is reported absent.
#[test]
fn find_correctness_matches_the_oracle() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut table: SkySet<u64> = SkySet::new();
    let mut oracle: HashSet<u64> = HashSet::new();

    for _ in 0..3000 {
        let key: u64 = rng.gen_range(0..5000);
        if rng.gen_bool(0.5) {
            table.insert(key);
            oracle.insert(key);
        } else {
            table.remove(&key);
            oracle.remove(&key);
        }
    }
    for key in 0..5000u64 {
        assert_eq!(table.contains(&key), oracle.contains(&key), "mismatch at {key}");
    }
}

/// Insert idempotence: a second insert of a key already present reports
/// no novelty and leaves the size unchanged.
#[test]
fn repeated_insert_of_the_same_key_is_idempotent() {
    let mut table: SkySet<u32> = SkySet::new();
    for i in 0..200u32 {
        assert!(table.insert(i));
    }
    let size_before = table.len();
    for i in 0..200u32 {
        assert!(!table.insert(i));
    }
    assert_eq!(table.len(), size_before);
}

/// Erase is exact: once a key is removed, it stays gone until re-inserted,
/// and removing it again reports nothing to remove.
#[test]
fn erase_is_exact_and_does_not_resurrect() {
    let mut table: SkySet<u32> = SkySet::new();
    for i in 0..300u32 {
        table.insert(i);
    }
    for i in (0..300u32).step_by(2) {
        assert!(table.remove(&i));
        assert!(!table.remove(&i));
        assert!(!table.contains(&i));
    }
    for i in (1..300u32).step_by(2) {
        assert!(table.contains(&i));
    }
}

/// Copy equivalence: `dup` (via `Clone`) produces the same key set, and
/// mutating the copy never reaches back into the original.
#[test]
fn dup_matches_the_source_and_then_diverges() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut table: SkySet<u32> = SkySet::new();
    for _ in 0..800 {
        let key = rng.gen_range(0..400);
        if rng.gen_bool(0.7) {
            table.insert(key);
        } else {
            table.remove(&key);
        }
    }
    let mut copy = table.clone();
    for k in 0..400u32 {
        assert_eq!(copy.contains(&k), table.contains(&k));
    }
    for i in 400..450u32 {
        copy.insert(i);
    }
    for i in 0..100u32 {
        copy.remove(&i);
    }
    for i in 400..450u32 {
        assert!(!table.contains(&i));
    }
}

/// Rehash invariance: `rehash(n)` for any valid `n` preserves the
/// contained key set and the size, whether it grows, shrinks, or tears
/// the allocation down entirely.
#[test]
fn rehash_preserves_keys_and_size_for_any_n() {
    use skymap::policy::FlatSlot;

    let mut rng = StdRng::seed_from_u64(4);
    let mut table: RawTable<u64, FlatSlot<u64>> = RawTable::with_capacity(15);
    let mut oracle: HashSet<u64> = HashSet::new();
    for _ in 0..400 {
        let key: u64 = rng.gen_range(0..300);
        if rng.gen_bool(0.65) {
            if table.find(hash_u64(&key), |v| *v == key).is_none() {
                table.insert(hash_u64(&key), key, hash_u64);
                oracle.insert(key);
            }
        } else if let Some(idx) = table.find(hash_u64(&key), |v| *v == key) {
            unsafe { table.erase(idx) };
            oracle.remove(&key);
        }
    }

    for &n in &[0usize, 1, 8, 64, 500] {
        table.rehash(n, hash_u64);
        assert_eq!(table.len(), oracle.len(), "size drifted after rehash({n})");
        for key in &oracle {
            assert!(table.find(hash_u64(key), |v| *v == *key).is_some(), "lost {key} after rehash({n})");
        }
    }
}

/// Stress-load: a large, randomly ordered insert/remove workload still
/// agrees with the oracle at the end, across however many grows and
/// in-place rehashes it took to get there.
#[test]
fn large_randomized_workload_agrees_with_the_oracle() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut table: SkySet<u64> = SkySet::new();
    let mut oracle: HashSet<u64> = HashSet::new();

    for _ in 0..20_000 {
        let key: u64 = rng.gen_range(0..8000);
        match rng.gen_range(0..3) {
            0 => {
                assert_eq!(table.insert(key), oracle.insert(key));
            }
            1 => {
                assert_eq!(table.remove(&key), oracle.remove(&key));
            }
            _ => {
                assert_eq!(table.contains(&key), oracle.contains(&key));
            }
        }
    }
    assert_eq!(table.len(), oracle.len());
    let seen: HashSet<u64> = table.iter().copied().collect();
    assert_eq!(seen, oracle);
}
