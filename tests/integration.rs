//! Integration tests for the public `Map` API.
//!
//! These tests exercise the hash table exclusively through
//! `perturbmap::{Map, MapConfig, MapError}`. No internal modules are
//! referenced.
//!
//! ## Coverage areas
//! - **Lifecycle**: empty construction, `clear`, `copy`
//! - **CRUD**: `set`, `get`, `get_or`, `contains`, `delete`, `pop`,
//!   `pop_or`, `pop_arbitrary`, `set_default`
//! - **Resize**: growth at the 2/3 load-factor threshold, shrink after
//!   deletion, tombstone reuse
//! - **Collisions**: many keys forced into the same low-order bits
//! - **Update / construction**: `update`, `update_from_pairs`,
//!   `update_from_sequences`, `from_keys`, `FromIterator`
//! - **Iteration & views**: snapshot iterators, concurrent-modification
//!   detection, live views, set algebra
//! - **Equality**: `PartialEq`/`equals`, order-insensitivity
//! - **Concurrency**: multi-thread insertion, a pop/delete race
//!
//! ## See also
//! - [`table`][perturbmap::table] unit tests — internal slot/probe
//!   invariants
//! - [`map`][perturbmap::map] unit tests — single-operation contracts

use std::collections::HashSet;
use std::thread;

use perturbmap::{Map, MapConfig, MapError};

// ================================================================================================
// Lifecycle
// ================================================================================================

/// # Scenario
/// A freshly constructed map is empty and reports absent keys correctly.
///
/// # Starting environment
/// No prior state.
///
/// # Actions
/// 1. `Map::new()`.
/// 2. `len()`, `contains("x")`, `get("x")`.
///
/// # Expected behavior
/// `len() == 0`, `contains == false`, `get` fails with `KeyNotFound`.
#[test]
fn empty_construction() {
    let map: Map<String, i32> = Map::new();
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
    assert!(!map.contains(&"x".to_string()));
    assert_eq!(map.get(&"x".to_string()), Err(MapError::KeyNotFound));
    assert_eq!(map.capacity(), 8);
}

/// # Scenario
/// `clear()` resets a populated map to its initial empty state.
#[test]
fn clear_resets_to_initial_state() {
    let map: Map<i32, i32> = Map::new();
    for i in 0..100 {
        map.set(i, i * 2);
    }
    assert!(map.capacity() > 8);

    map.clear();

    assert_eq!(map.len(), 0);
    assert_eq!(map.capacity(), 8);
    assert!(!map.contains(&0));
}

/// # Scenario
/// `copy()` produces an equal map that can be mutated independently.
#[test]
fn copy_is_independent_and_equal() {
    let map: Map<String, i32> = Map::new();
    map.set("a".to_string(), 1);
    map.set("b".to_string(), 2);

    let copy = map.copy();
    assert_eq!(copy.len(), map.len());
    assert!(copy.equals(&map));
    assert_eq!(copy, map);

    copy.set("c".to_string(), 3);
    assert_eq!(copy.len(), 3);
    assert_eq!(map.len(), 2);
    assert!(!copy.equals(&map));
}

/// # Scenario
/// `Clone` aliases the same table; mutating the clone is visible through
/// the original handle.
#[test]
fn clone_aliases_same_table() {
    let map: Map<String, i32> = Map::new();
    let alias = map.clone();

    alias.set("a".to_string(), 1);
    assert_eq!(map.get(&"a".to_string()), Ok(1));
}

// ================================================================================================
// Basic CRUD
// ================================================================================================

/// # Scenario
/// `set` then `get` round-trips a single key.
#[test]
fn set_then_get_round_trips() {
    let map: Map<&str, i32> = Map::new();
    map.set("hello", 42);
    assert_eq!(map.get(&"hello"), Ok(42));
}

/// # Scenario
/// Overwriting a key updates its value without changing `len`.
#[test]
fn overwrite_preserves_len() {
    let map: Map<&str, i32> = Map::new();
    map.set("k", 1);
    map.set("k", 2);
    assert_eq!(map.get(&"k"), Ok(2));
    assert_eq!(map.len(), 1);
}

/// # Scenario
/// Deleting a key removes it from the domain.
#[test]
fn set_then_delete_removes_key() {
    let map: Map<&str, i32> = Map::new();
    map.set("k", 1);
    map.delete(&"k").unwrap();
    assert!(!map.contains(&"k"));
    assert_eq!(map.get(&"k"), Err(MapError::KeyNotFound));
}

/// # Scenario
/// Tombstone reuse: deleting then re-inserting the same key must not
/// shadow the new value, and must not double-count towards `used`.
#[test]
fn tombstone_reuse_does_not_shadow() {
    let map: Map<&str, i32> = Map::new();
    map.set("a", 1);
    map.delete(&"a").unwrap();
    map.set("a", 2);

    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&"a"), Ok(2));
    assert_eq!(map.used(), 1);
}

/// # Scenario
/// `get_or` and `pop_or` never fail, returning the supplied default for
/// absent keys.
#[test]
fn get_or_and_pop_or_use_default() {
    let map: Map<&str, i32> = Map::new();
    assert_eq!(map.get_or(&"missing", -1), -1);
    assert_eq!(map.pop_or(&"missing", -1), -1);

    map.set("present", 7);
    assert_eq!(map.get_or(&"present", -1), 7);
    assert_eq!(map.pop_or(&"present", -1), 7);
    assert!(!map.contains(&"present"));
}

/// # Scenario
/// `delete`/`pop` on an absent key fails with `KeyNotFound`.
#[test]
fn delete_and_pop_absent_key_fails() {
    let map: Map<&str, i32> = Map::new();
    assert_eq!(map.delete(&"ghost"), Err(MapError::KeyNotFound));
    assert_eq!(map.pop(&"ghost"), Err(MapError::KeyNotFound));
}

/// # Scenario
/// `pop_arbitrary` on an empty map fails with `EmptyMap`; on a populated
/// map it removes and returns an entry that was genuinely live.
#[test]
fn pop_arbitrary_behavior() {
    let map: Map<i32, i32> = Map::new();
    assert_eq!(map.pop_arbitrary(), Err(MapError::EmptyMap));

    map.set(1, 10);
    map.set(2, 20);
    let (k, v) = map.pop_arbitrary().unwrap();
    assert!((k == 1 && v == 10) || (k == 2 && v == 20));
    assert_eq!(map.len(), 1);
}

/// # Scenario
/// `set_default` inserts the default only on first call, returning the
/// stable current value thereafter.
#[test]
fn set_default_inserts_once() {
    let map: Map<&str, i32> = Map::new();
    assert_eq!(map.set_default("k", 5), 5);
    assert_eq!(map.set_default("k", 99), 5);
    assert_eq!(map.len(), 1);
}

// ================================================================================================
// Resize & collisions
// ================================================================================================

/// # Scenario
/// Inserting keys past the 2/3 load-factor threshold quadruples capacity
/// from the base size.
///
/// # Starting environment
/// Fresh map, `capacity() == 8`.
///
/// # Actions
/// Insert `"k0"`..`"k5"` (6 keys).
///
/// # Expected behavior
/// `6 / 8 >= 2/3`, so the table has grown by the small-side factor (x4)
/// to capacity 32 by the time the 6th insert returns.
#[test]
fn grow_by_quadrupling_from_base_size() {
    let map: Map<String, i32> = Map::new();
    for i in 0..6 {
        map.set(format!("k{i}"), i);
    }
    assert_eq!(map.len(), 6);
    assert_eq!(map.capacity(), 32);
}

/// # Scenario
/// Forcing many low-bit hash collisions — every key drawn from a 2-letter
/// alphabet, over 10,000 of them inserted far past initial capacity —
/// must still admit every key and return correct values.
#[test]
fn many_collisions_resolve_correctly() {
    let map: Map<String, usize> = Map::new();
    let mut expected = std::collections::HashMap::new();

    // 2^14 = 16,384 distinct keys built from only "a"/"b", comfortably
    // past the 10,000 spec.md §8 scenario 4 calls for.
    let width = 14;
    let alphabet = ["a", "b"];
    for n in 0..(1usize << width) {
        let key: String = (0..width).map(|bit| alphabet[(n >> bit) & 1]).collect();
        map.set(key.clone(), n);
        expected.insert(key, n);
    }

    for (k, v) in &expected {
        assert_eq!(map.get(&k.clone()), Ok(*v));
    }
    assert_eq!(map.len(), expected.len());
}

/// # Scenario
/// Inserting N unique keys then deleting all of them returns the map to
/// an empty state with capacity back at the minimum, after enough
/// shrinks have run.
#[test]
fn insert_then_delete_all_returns_to_minimum_capacity() {
    let map: Map<i32, i32> = Map::new();
    for i in 0..500 {
        map.set(i, i);
    }
    assert!(map.capacity() > 8);

    for i in 0..500 {
        map.delete(&i).unwrap();
    }

    assert_eq!(map.len(), 0);
    assert_eq!(map.capacity(), 8);
    assert_eq!(map, Map::new());
}

/// # Scenario
/// A small `MapConfig` override forces the same grow/shrink behavior at
/// a much smaller scale, so tests don't need to insert 50,000 entries to
/// exercise the large-side growth/shrink factors.
#[test]
fn custom_config_changes_cutoff() {
    let config = MapConfig {
        grow_cutoff: 4,
        ..MapConfig::default()
    };
    let map: Map<i32, i32> = Map::with_config(config).unwrap();

    for i in 0..6 {
        map.set(i, i);
    }
    // used_count (6) was already >= grow_cutoff (4) when the grow
    // trigger fired, so the large-side factor (x2) applies: 8 -> 16.
    assert_eq!(map.capacity(), 16);
}

/// # Scenario
/// An invalid `MapConfig` is rejected at construction time rather than
/// silently misbehaving later.
#[test]
fn invalid_config_rejected() {
    let config = MapConfig {
        min_capacity: 7, // not a power of two
        ..MapConfig::default()
    };
    let result: Result<Map<i32, i32>, _> = Map::with_config(config);
    assert_eq!(result, Err(MapError::InvalidConfig("min_capacity must be a power of two >= 2")));
}

// ================================================================================================
// Update & construction
// ================================================================================================

/// # Scenario
/// `update` from another map is equivalent to a sequence of `set` calls.
#[test]
fn update_from_map_matches_manual_sets() {
    let source: Map<&str, i32> = Map::new();
    source.set("a", 1);
    source.set("b", 2);

    let dest: Map<&str, i32> = Map::new();
    dest.set("b", 99);
    dest.update(&source);

    assert_eq!(dest.get(&"a"), Ok(1));
    assert_eq!(dest.get(&"b"), Ok(2));
    assert_eq!(dest.len(), 2);
}

/// # Scenario
/// A map can update from itself (merging into itself is a no-op) without
/// deadlocking or panicking on a double borrow.
#[test]
fn update_from_self_is_safe() {
    let map: Map<&str, i32> = Map::new();
    map.set("a", 1);
    map.update(&map.clone());
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&"a"), Ok(1));
}

/// # Scenario
/// `update_from_pairs` merges a sequence of statically-typed 2-tuples.
#[test]
fn update_from_pairs_merges() {
    let map: Map<&str, i32> = Map::new();
    map.update_from_pairs(vec![("a", 1), ("b", 2)]);
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&"a"), Ok(1));
}

/// # Scenario
/// `update_from_sequences` fails with `BadPair` on the first
/// wrong-length element, and commits nothing past that point that wasn't
/// already applied.
#[test]
fn update_from_sequences_rejects_bad_pair() {
    let map: Map<i32, i32> = Map::new();
    let pairs: Vec<Vec<i32>> = vec![vec![1, 10], vec![2, 20, 30], vec![3, 30]];

    let result = map.update_from_sequences(pairs);
    assert_eq!(result, Err(MapError::BadPair { index: 1, len: 3 }));
    // The valid pair before the bad one was already applied.
    assert_eq!(map.get(&1), Ok(10));
    assert!(!map.contains(&3));
}

/// # Scenario
/// `from_keys` produces a map of unique keys, each bound to the same
/// value.
#[test]
fn from_keys_produces_uniform_map() {
    let map = Map::from_keys(vec!["a", "b", "a", "c"], 0i32);
    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&"a"), Ok(0));
    assert_eq!(map.get(&"c"), Ok(0));
}

/// # Scenario
/// `FromIterator`/`collect` builds a map from a sequence of pairs.
#[test]
fn collect_from_pairs() {
    let map: Map<&str, i32> = vec![("a", 1), ("b", 2)].into_iter().collect();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&"a"), Ok(1));
}

/// # Scenario
/// `TryFrom<Vec<Vec<T>>>` builds a map from a sequence of untyped pairs,
/// mirroring `dict(iterable_of_pairs)`, and fails with `BadPair` on the
/// first malformed element instead of panicking.
#[test]
fn try_from_sequences_builds_or_fails() {
    let map = Map::<i32, i32>::try_from(vec![vec![1, 10], vec![2, 20]]).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&2), Ok(20));

    let err = Map::<i32, i32>::try_from(vec![vec![1]]).unwrap_err();
    assert_eq!(err, MapError::BadPair { index: 0, len: 1 });
}

// ================================================================================================
// Iteration & views
// ================================================================================================

/// # Scenario
/// Snapshot iterators visit every live entry exactly once.
#[test]
fn entries_iterator_visits_every_live_entry() {
    let map: Map<i32, i32> = Map::new();
    for i in 0..20 {
        map.set(i, i * 10);
    }

    let mut seen = HashSet::new();
    for result in map.entries_iter() {
        let (k, v) = result.unwrap();
        assert_eq!(v, k * 10);
        seen.insert(k);
    }
    assert_eq!(seen.len(), 20);
}

/// # Scenario
/// Mutating the map while a snapshot iterator is mid-traversal surfaces
/// `ConcurrentModification` instead of silently skipping or duplicating
/// entries.
#[test]
fn iterator_detects_concurrent_modification() {
    let map: Map<i32, i32> = Map::new();
    for i in 0..10 {
        map.set(i, i);
    }

    let mut iter = map.keys_iter();
    assert!(iter.next().unwrap().is_ok());

    map.set(10, 10); // changes live_count under the iterator's feet

    let mut saw_error = false;
    for item in iter {
        if item.is_err() {
            saw_error = true;
            assert_eq!(item.unwrap_err(), MapError::ConcurrentModification);
            break;
        }
    }
    assert!(saw_error);
}

/// # Scenario
/// A view's `len()` tracks the map live, unlike a snapshot iterator.
#[test]
fn view_length_is_live() {
    let map: Map<i32, i32> = Map::new();
    let keys = map.keys();
    assert_eq!(keys.len(), 0);

    map.set(1, 1);
    assert_eq!(keys.len(), 1);
}

/// # Scenario
/// Set algebra over a `KeysView` matches plain set semantics.
#[test]
fn keys_view_set_algebra() {
    let map: Map<i32, i32> = Map::new();
    for i in [1, 2, 3] {
        map.set(i, i);
    }

    let other = vec![2, 3, 4];
    let keys = map.keys();

    let union: HashSet<i32> = keys.union(other.clone()).into_iter().collect();
    assert_eq!(union, HashSet::from([1, 2, 3, 4]));

    let intersection: HashSet<i32> = keys.intersection(other.clone()).into_iter().collect();
    assert_eq!(intersection, HashSet::from([2, 3]));

    let difference: HashSet<i32> = keys.difference(other.clone()).into_iter().collect();
    assert_eq!(difference, HashSet::from([1]));

    let symdiff: HashSet<i32> = keys.symmetric_difference(other).into_iter().collect();
    assert_eq!(symdiff, HashSet::from([1, 4]));
}

// ================================================================================================
// Equality
// ================================================================================================

/// # Scenario
/// Equality is order-insensitive and depends only on domain and values.
#[test]
fn equality_is_order_insensitive() {
    let a: Map<&str, i32> = Map::new();
    a.set("x", 1);
    a.set("y", 2);

    let b: Map<&str, i32> = Map::new();
    b.set("y", 2);
    b.set("x", 1);

    assert_eq!(a, b);

    b.set("y", 3);
    assert_ne!(a, b);
}

// ================================================================================================
// Concurrency
// ================================================================================================

/// # Scenario
/// Ten threads each insert 1,000 distinct keys concurrently; afterwards
/// every inserted key is present with its inserted value.
#[test]
fn concurrent_insertion_from_many_threads() {
    let map: Map<String, i32> = Map::new();
    let mut handles = Vec::new();

    for t in 0..10 {
        let map = map.clone();
        handles.push(thread::spawn(move || {
            for i in 0..1_000 {
                map.set(format!("t{t}-{i}"), t * 1_000 + i);
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(map.len(), 10_000);
    for t in 0..10 {
        for i in 0..1_000 {
            assert_eq!(map.get(&format!("t{t}-{i}")), Ok(t * 1_000 + i));
        }
    }
}

/// # Scenario
/// One thread pops every key with a default while another deletes every
/// key; after both finish the map is empty and every pop observation was
/// either the original value or the default.
#[test]
fn pop_and_delete_race() {
    let map: Map<i32, i32> = Map::new();
    for i in 0..10_000 {
        map.set(i, i);
    }

    let popper = {
        let map = map.clone();
        thread::spawn(move || {
            for i in 0..10_000 {
                let observed = map.pop_or(&i, 2);
                assert!(observed == i || observed == 2);
            }
        })
    };
    let deleter = {
        let map = map.clone();
        thread::spawn(move || {
            for i in 0..10_000 {
                let _ = map.delete(&i);
            }
        })
    };

    popper.join().unwrap();
    deleter.join().unwrap();

    assert_eq!(map.len(), 0);
}
