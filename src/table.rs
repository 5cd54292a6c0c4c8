//! # Table
//!
//! The slot array, probe sequence, and grow/shrink policy that everything
//! else in this crate is built on. This is where the bulk of the design
//! lives — [`Map`](crate::Map) and the iterator/view types are thin
//! adapters over a [`Table`].
//!
//! ## Design Invariants
//!
//! - `0 <= live_count <= used_count <= capacity`.
//! - `used_count < capacity` strictly — there is always at least one
//!   `Empty` slot, so every probe sequence terminates.
//! - `capacity` is a power of two and `>= config.min_capacity`.
//! - `used_count < (numerator/denominator) * capacity` immediately after
//!   any grow.
//! - For every `Live` slot at index `i`, probing from `hash(key) & mask`
//!   visits `i` before reaching any `Empty` slot (probe-chain integrity).
//! - A `Live` slot's cached hash equals `hash(key)` as of the time the key
//!   was inserted.
//!
//! ## Probing
//!
//! Perturbation probing, faithful to CPython's classic (pre-3.6) `dict`:
//! the probe index is folded with `& mask`, and on each step the full
//! hash (not just its low bits) is mixed back in via a right-shifting
//! `perturb` accumulator, so keys that collide in the low
//! `log2(capacity)` bits diverge quickly. Once `perturb` reaches zero the
//! recurrence degenerates to `i <- (5*i + 1) & mask`, which visits every
//! index of a power-of-two table, guaranteeing termination.
//!
//! A `Tombstone` never terminates a probe (the key it once held may have
//! displaced a later key past it), but the *first* tombstone seen along a
//! probe sequence is reused for insertion when no live match is found
//! before an `Empty` slot.
//!
//! ## Resize policy
//!
//! Resize is triggered synchronously, inside the mutating operation that
//! crosses a threshold — there is no background or deferred rebuild.
//! Growing quadruples capacity below [`MapConfig::grow_cutoff`] live
//! entries and doubles it above, trading space for fewer resizes while
//! small and conserving memory once large. A table that is load-factor
//! saturated by tombstones rather than live entries is rebuilt at its
//! *current* capacity, simply to purge the tombstones.
//!
//! Rebuild re-enters the insertion primitive for every surviving live
//! entry, so that primitive (`insert_with_hash`) must never itself
//! trigger a resize check — otherwise a rebuild could recurse into
//! another rebuild mid-flight.
//!
//! `prev_capacity` is the shrink watermark. A grow writes it once, to the
//! pre-grow capacity; a shrink rewrites it to the post-shrink capacity, so
//! the watermark always tracks the table's most recent resize rather than
//! going stale after the first shrink in a run of deletes.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};

use tracing::{debug, trace};

/// Tunable thresholds governing table growth and shrinkage.
///
/// The defaults reproduce the constants of the reference design exactly;
/// overriding them is mainly useful for tests that want to exercise
/// resize behavior without inserting tens of thousands of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapConfig {
    /// Minimum (and initial) table capacity. Must be a power of two >= 2.
    pub min_capacity: usize,
    /// Numerator of the load factor that triggers growth and the shrink
    /// watermark (default `2`, i.e. `2/3`).
    pub load_numerator: usize,
    /// Denominator of the load factor (default `3`).
    pub load_denominator: usize,
    /// Entry-count cutoff below which growth quadruples capacity and
    /// above which it only doubles it.
    pub grow_cutoff: usize,
    /// Growth multiplier used below `grow_cutoff`.
    pub grow_factor_small: usize,
    /// Growth multiplier used at or above `grow_cutoff`.
    pub grow_factor_large: usize,
    /// Shrink divisor used below `grow_cutoff` live entries.
    pub shrink_factor_small: usize,
    /// Shrink divisor used at or above `grow_cutoff` live entries.
    pub shrink_factor_large: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            min_capacity: 8,
            load_numerator: 2,
            load_denominator: 3,
            grow_cutoff: 50_000,
            grow_factor_small: 4,
            grow_factor_large: 2,
            shrink_factor_small: 4,
            shrink_factor_large: 2,
        }
    }
}

impl MapConfig {
    /// Validates this configuration, matching the constraints the `Table`
    /// relies on for the probe-termination and power-of-two invariants.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.min_capacity < 2 || !self.min_capacity.is_power_of_two() {
            return Err("min_capacity must be a power of two >= 2");
        }
        if self.load_numerator == 0 || self.load_numerator >= self.load_denominator {
            return Err("load_numerator must be nonzero and less than load_denominator");
        }
        if self.grow_factor_small < 2 || self.grow_factor_large < 2 {
            return Err("grow factors must be at least 2");
        }
        if self.shrink_factor_small < 2 || self.shrink_factor_large < 2 {
            return Err("shrink factors must be at least 2");
        }
        Ok(())
    }
}

/// The state a single slot of the table can hold.
#[derive(Debug, Clone)]
pub enum Slot<K, V> {
    /// Never occupied. Terminates probe sequences.
    Empty,
    /// Previously occupied, now deleted. Does not terminate probing, but
    /// may be reused by a later insertion along the same probe chain.
    Tombstone,
    /// Occupied. Carries the cached hash of `key` for fast rehash during
    /// resize and a fast equality short-circuit during probing.
    Live { hash: u64, key: K, value: V },
}

impl<K, V> Slot<K, V> {
    pub(crate) fn is_live(&self) -> bool {
        matches!(self, Slot::Live { .. })
    }
}

/// Outcome of locating a key's slot.
enum Location {
    /// A live slot already holds this key.
    Hit(usize),
    /// No live slot holds this key; insertion should happen at this
    /// index (either the first tombstone seen, or the terminating empty
    /// slot).
    Miss(usize),
}

/// The flat, open-addressed slot array backing [`Map`](crate::Map).
pub struct Table<K, V, S = RandomState> {
    slots: Vec<Slot<K, V>>,
    capacity: usize,
    mask: usize,
    live_count: usize,
    used_count: usize,
    prev_capacity: usize,
    config: MapConfig,
    hasher: S,
}

impl<K, V, S> Table<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub(crate) fn with_hasher_and_config(hasher: S, config: MapConfig) -> Self {
        let capacity = config.min_capacity;
        Table {
            slots: (0..capacity).map(|_| Slot::Empty).collect(),
            capacity,
            mask: capacity - 1,
            live_count: 0,
            used_count: 0,
            prev_capacity: capacity,
            config,
            hasher,
        }
    }

    pub(crate) fn config(&self) -> MapConfig {
        self.config
    }

    pub(crate) fn len(&self) -> usize {
        self.live_count
    }

    pub(crate) fn used(&self) -> usize {
        self.used_count
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn slots(&self) -> &[Slot<K, V>] {
        &self.slots
    }

    fn hash_of(&self, key: &K) -> u64 {
        let mut hasher = self.hasher.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }

    /// The heart of the design: walk the perturbation probe sequence from
    /// `hash & mask`, remembering the first tombstone seen, until a live
    /// match, an empty slot, or (in principle) the whole table has been
    /// visited — invariant 2 guarantees an empty slot always exists.
    fn locate(&self, hash: u64, key: &K) -> Location {
        let mut i = (hash as usize) & self.mask;
        let mut perturb = hash;
        let mut freeslot: Option<usize> = None;

        loop {
            match &self.slots[i] {
                Slot::Empty => return Location::Miss(freeslot.unwrap_or(i)),
                Slot::Tombstone => {
                    if freeslot.is_none() {
                        freeslot = Some(i);
                    }
                }
                Slot::Live {
                    hash: slot_hash,
                    key: slot_key,
                    ..
                } => {
                    if *slot_hash == hash && slot_key == key {
                        return Location::Hit(i);
                    }
                }
            }

            i = (i
                .wrapping_shl(2)
                .wrapping_add(i)
                .wrapping_add(perturb as usize)
                .wrapping_add(1))
                & self.mask;
            perturb >>= 5;
        }
    }

    /// Insert or overwrite, using a precomputed hash, without ever
    /// triggering a resize. Used both as the final step of the public
    /// `insert` and as the bypass path `rebuild` needs to avoid recursing
    /// into another resize mid-rebuild.
    fn insert_with_hash(&mut self, hash: u64, key: K, value: V) -> Option<V> {
        match self.locate(hash, &key) {
            Location::Hit(idx) => match &mut self.slots[idx] {
                Slot::Live { value: slot_value, .. } => Some(std::mem::replace(slot_value, value)),
                _ => unreachable!("locate returned Hit for a non-live slot"),
            },
            Location::Miss(idx) => {
                let was_tombstone = matches!(self.slots[idx], Slot::Tombstone);
                self.slots[idx] = Slot::Live { hash, key, value };
                self.live_count += 1;
                if !was_tombstone {
                    self.used_count += 1;
                }
                None
            }
        }
    }

    /// Insert or overwrite `key` with `value`, growing or rebuilding the
    /// table afterwards if the load factor demands it.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_of(&key);
        let old = self.insert_with_hash(hash, key, value);
        self.maybe_resize();
        old
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        let hash = self.hash_of(key);
        match self.locate(hash, key) {
            Location::Hit(idx) => match &self.slots[idx] {
                Slot::Live { value, .. } => Some(value),
                _ => unreachable!(),
            },
            Location::Miss(_) => None,
        }
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        let hash = self.hash_of(key);
        matches!(self.locate(hash, key), Location::Hit(_))
    }

    /// Remove `key`, turning its slot into a tombstone, then consider
    /// shrinking the table.
    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let hash = self.hash_of(key);
        match self.locate(hash, key) {
            Location::Hit(idx) => {
                let value = match std::mem::replace(&mut self.slots[idx], Slot::Tombstone) {
                    Slot::Live { value, .. } => value,
                    _ => unreachable!(),
                };
                self.live_count -= 1;
                self.maybe_shrink();
                Some(value)
            }
            Location::Miss(_) => None,
        }
    }

    /// Remove and return some live entry, chosen by table order. Used to
    /// back `pop_arbitrary`; does not require `K: Clone`.
    pub(crate) fn pop_arbitrary(&mut self) -> Option<(K, V)> {
        let idx = self.slots.iter().position(Slot::is_live)?;
        let (key, value) = match std::mem::replace(&mut self.slots[idx], Slot::Tombstone) {
            Slot::Live { key, value, .. } => (key, value),
            _ => unreachable!(),
        };
        self.live_count -= 1;
        self.maybe_shrink();
        Some((key, value))
    }

    /// Reset to a freshly empty table at `min_capacity`.
    pub(crate) fn clear(&mut self) {
        let capacity = self.config.min_capacity;
        self.slots = (0..capacity).map(|_| Slot::Empty).collect();
        self.capacity = capacity;
        self.mask = capacity - 1;
        self.live_count = 0;
        self.used_count = 0;
        self.prev_capacity = capacity;
    }

    fn load_crossed(&self, used: usize, capacity: usize) -> bool {
        used * self.config.load_denominator >= capacity * self.config.load_numerator
    }

    /// Called after every insertion; decides whether the used/capacity
    /// load factor has crossed the growth threshold and, if so, whether
    /// that means the table should actually grow or merely be rebuilt in
    /// place to purge tombstones.
    fn maybe_resize(&mut self) {
        if !self.load_crossed(self.used_count, self.capacity) {
            return;
        }

        if self.load_crossed(self.live_count, self.capacity) {
            let factor = if self.used_count < self.config.grow_cutoff {
                self.config.grow_factor_small
            } else {
                self.config.grow_factor_large
            };
            let old_capacity = self.capacity;
            let new_capacity = old_capacity * factor;
            debug!(
                old_capacity,
                new_capacity, live = self.live_count, used = self.used_count, "growing table"
            );
            self.prev_capacity = old_capacity.max(self.config.min_capacity);
            self.rebuild(new_capacity);
        } else {
            trace!(
                capacity = self.capacity,
                live = self.live_count,
                used = self.used_count,
                "rebuilding table in place to purge tombstones"
            );
            let capacity = self.capacity;
            self.rebuild(capacity);
        }
    }

    /// Called after every deletion; shrinks the table when live entries
    /// have fallen well below the capacity the table grew to last time.
    ///
    /// `prev_capacity` is the shrink watermark, but it is only ever
    /// *written* by a grow (the pre-grow capacity); left untouched after a
    /// shrink it would keep comparing against a stale, much larger value
    /// on every subsequent delete, letting `new_capacity` undershoot what
    /// `live_count` actually needs and eventually filling every slot live,
    /// which would deadlock `locate`'s probe loop (invariant 2). Both
    /// halves of the fix live here: `new_capacity` is bumped back up by
    /// powers of two until it can hold `live_count` under the load factor
    /// before `rebuild` ever runs, and `prev_capacity` is rewritten to the
    /// post-shrink capacity so the *next* delete's watermark reflects the
    /// table's actual current size rather than the last grow's.
    fn maybe_shrink(&mut self) {
        if self.capacity <= self.config.min_capacity {
            return;
        }
        if self.live_count * self.config.load_denominator >= self.prev_capacity * self.config.load_numerator
        {
            return;
        }

        let factor = if self.live_count < self.config.grow_cutoff {
            self.config.shrink_factor_small
        } else {
            self.config.shrink_factor_large
        };
        let mut new_capacity = (self.capacity / factor).max(self.config.min_capacity);
        while new_capacity < self.capacity && self.load_crossed(self.live_count, new_capacity) {
            new_capacity *= 2;
        }
        if new_capacity >= self.capacity {
            // The floor walked new_capacity back up to (or past) the
            // current capacity: there is nothing to actually shrink to
            // yet, but the watermark still needs to track live_count
            // against the present capacity, or every later delete would
            // re-trigger this same check against the stale old watermark.
            self.prev_capacity = self.capacity;
            return;
        }
        trace!(
            old_capacity = self.capacity,
            new_capacity, live = self.live_count, "shrinking table"
        );
        self.prev_capacity = new_capacity;
        self.rebuild(new_capacity);
    }

    /// Allocate a fresh all-`Empty` array of `new_capacity` slots and
    /// reinsert every currently-live entry, eliminating all tombstones.
    /// Reinsertion goes through `insert_with_hash`, which never triggers
    /// another resize — that guard is what keeps this from recursing.
    fn rebuild(&mut self, new_capacity: usize) {
        let old_slots = std::mem::replace(
            &mut self.slots,
            (0..new_capacity).map(|_| Slot::Empty).collect(),
        );
        self.capacity = new_capacity;
        self.mask = new_capacity - 1;
        self.live_count = 0;
        self.used_count = 0;

        for slot in old_slots {
            if let Slot::Live { hash, key, value } = slot {
                self.insert_with_hash(hash, key, value);
            }
        }
    }
}

impl<K, V, S> Table<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Deep-clone every live binding into a fresh table at `min_capacity`,
    /// as `Map::copy` requires.
    pub(crate) fn copy(&self) -> Table<K, V, S> {
        let mut fresh = Table::with_hasher_and_config(self.hasher.clone(), self.config);
        for slot in &self.slots {
            if let Slot::Live { key, value, .. } = slot {
                fresh.insert(key.clone(), value.clone());
            }
        }
        fresh
    }
}
