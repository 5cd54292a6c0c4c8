//! # Map API
//!
//! The public surface layered on top of [`Table`]: `set`, `get`, `delete`,
//! `pop`, `update`, `copy`, equality, and the `from_keys` constructor.
//! Every operation here funnels straight into one `Table` method and
//! returns — there is no operation that spans more than one critical
//! section except `update`/`copy`, which deliberately snapshot their
//! source before reacquiring the destination's lock (see their doc
//! comments for why).
//!
//! ## Concurrency
//!
//! `Map` is a thin `Arc`-backed handle: cloning it aliases the same
//! underlying table rather than copying bindings (use [`Map::copy`] for
//! a deep, independently-mutable clone). The table itself lives behind a
//! [`parking_lot::ReentrantMutex`] wrapping a `RefCell`, acquired for the
//! full duration of each public operation and released on every exit
//! path, including error paths. The mutex is reentrant because a resize
//! triggered mid-`insert` re-enters the table's own insertion primitive
//! on the same thread.

use std::cell::RefCell;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use crate::error::MapError;
use crate::iter::{Entries, EntriesView, Keys, KeysView, Values, ValuesView};
use crate::table::{MapConfig, Slot, Table};

/// An in-memory hash map using open addressing, tombstone deletion, and
/// perturbation probing — a reimplementation of CPython's classic
/// (pre-3.6) `dict`.
///
/// `K` needs the two capabilities a hashable, comparable key requires:
/// [`Hash`] and [`Eq`]. `V` is otherwise unconstrained; individual
/// operations (`get`, iteration, `copy`, equality) add `Clone`/`PartialEq`
/// only where returning or comparing a value by need demands it, so a
/// `Map<K, V>` holding a non-`Clone` `V` still supports `set`/`delete`/
/// `contains`.
pub struct Map<K, V, S = RandomState> {
    inner: Arc<ReentrantMutex<RefCell<Table<K, V, S>>>>,
}

impl<K, V, S> Clone for Map<K, V, S> {
    /// Cheap alias of the same underlying table — not a deep copy. See
    /// [`Map::copy`] for that.
    fn clone(&self) -> Self {
        Map { inner: Arc::clone(&self.inner) }
    }
}

impl<K, V, S> Map<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub(crate) fn with_table<R>(&self, f: impl FnOnce(&Table<K, V, S>) -> R) -> R {
        let guard = self.inner.lock();
        f(&guard.borrow())
    }

    fn with_table_mut<R>(&self, f: impl FnOnce(&mut Table<K, V, S>) -> R) -> R {
        let guard = self.inner.lock();
        f(&mut guard.borrow_mut())
    }

    /// Builds a `Map` backed by an explicit `BuildHasher` and an explicit
    /// [`MapConfig`], validating the configuration up front.
    pub fn with_hasher_and_config(hasher: S, config: MapConfig) -> Result<Self, MapError> {
        config.validate().map_err(MapError::InvalidConfig)?;
        Ok(Map {
            inner: Arc::new(ReentrantMutex::new(RefCell::new(
                Table::with_hasher_and_config(hasher, config),
            ))),
        })
    }

    /// Inserts or overwrites `key` with `value`, returning the previous
    /// value if `key` was already present.
    ///
    /// `set(k, v); set(k, v)` leaves the map identical to a single
    /// `set(k, v)` — idempotent, as required.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.with_table_mut(|table| table.insert(key, value))
    }

    /// Returns a clone of the value for `key`, or `KeyNotFound`.
    pub fn get(&self, key: &K) -> Result<V, MapError>
    where
        V: Clone,
    {
        self.with_table(|table| table.get(key).cloned()).ok_or(MapError::KeyNotFound)
    }

    /// Returns a clone of the value for `key`, or `default` if absent.
    /// Never fails.
    pub fn get_or(&self, key: &K, default: V) -> V
    where
        V: Clone,
    {
        self.with_table(|table| table.get(key).cloned()).unwrap_or(default)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.with_table(|table| table.contains(key))
    }

    /// Removes `key`, returning its value, or fails with `KeyNotFound`.
    pub fn delete(&self, key: &K) -> Result<V, MapError> {
        self.with_table_mut(|table| table.remove(key)).ok_or(MapError::KeyNotFound)
    }

    /// Removes `key` and returns its value; fails with `KeyNotFound` if
    /// absent. See [`Map::pop_or`] for the infallible, defaulted form.
    pub fn pop(&self, key: &K) -> Result<V, MapError> {
        self.delete(key)
    }

    /// Removes `key` and returns its value, or `default` if absent.
    /// Never fails.
    pub fn pop_or(&self, key: &K, default: V) -> V {
        self.with_table_mut(|table| table.remove(key)).unwrap_or(default)
    }

    /// Removes and returns some live entry. Fails with `EmptyMap` if the
    /// map has no live entries. Which entry is returned is unspecified
    /// but always corresponds to an actual live slot.
    pub fn pop_arbitrary(&self) -> Result<(K, V), MapError> {
        self.with_table_mut(|table| table.pop_arbitrary()).ok_or(MapError::EmptyMap)
    }

    /// Inserts `default` if `key` is absent, then returns the current
    /// (old or newly inserted) value. One critical section: the check and
    /// the insert are atomic with respect to other operations.
    pub fn set_default(&self, key: K, default: V) -> V
    where
        V: Clone,
    {
        self.with_table_mut(|table| match table.get(&key) {
            Some(existing) => existing.clone(),
            None => {
                table.insert(key, default.clone());
                default
            }
        })
    }

    /// Resets the map to its initial empty state (`capacity` returns to
    /// `min_capacity`, every slot becomes `Empty`).
    pub fn clear(&self) {
        self.with_table_mut(Table::clear);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.with_table(Table::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current table capacity (always a power of two `>= min_capacity`).
    pub fn capacity(&self) -> usize {
        self.with_table(Table::capacity)
    }

    /// Live + tombstone slot count (`used_count`, which governs growth).
    pub fn used(&self) -> usize {
        self.with_table(Table::used)
    }

    /// A snapshot-counted, single-pass iterator over keys. See the
    /// [`crate::iter`] module docs for its concurrent-modification
    /// contract.
    pub fn keys_iter(&self) -> Keys<K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        Keys::new(self.clone())
    }

    pub fn values_iter(&self) -> Values<K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        Values::new(self.clone())
    }

    pub fn entries_iter(&self) -> Entries<K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        Entries::new(self.clone())
    }

    /// A live view over the current keys, supporting set algebra against
    /// any `IntoIterator<Item = K>`.
    pub fn keys(&self) -> KeysView<K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        KeysView::new(self.clone())
    }

    pub fn values(&self) -> ValuesView<K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        ValuesView::new(self.clone())
    }

    pub fn entries(&self) -> EntriesView<K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        EntriesView::new(self.clone())
    }

    /// Merges every entry of `other` into `self`, as a sequence of `set`
    /// calls.
    ///
    /// `other`'s entries are cloned out under its own lock first, then
    /// applied to `self` under a separate lock acquisition per entry —
    /// this keeps `self.update(&self)` (merging a map into itself) safe
    /// without risking a double mutable borrow of the same underlying
    /// `RefCell`, which a single combined critical section spanning both
    /// tables could not guarantee when `self` and `other` alias.
    pub fn update(&self, other: &Map<K, V, S>)
    where
        K: Clone,
        V: Clone,
    {
        let snapshot: Vec<(K, V)> = other.with_table(|table| {
            table
                .slots()
                .iter()
                .filter_map(|slot| match slot {
                    Slot::Live { key, value, .. } => Some((key.clone(), value.clone())),
                    _ => None,
                })
                .collect()
        });
        for (key, value) in snapshot {
            self.set(key, value);
        }
    }

    /// Merges a sequence of statically-typed pairs into `self`. Because
    /// a Rust tuple's arity is fixed at compile time, there is no
    /// runtime length to validate here — the `BadPair` failure mode only
    /// arises for the more dynamically-typed [`Map::update_from_sequences`].
    pub fn update_from_pairs<I: IntoIterator<Item = (K, V)>>(&self, pairs: I) {
        for (key, value) in pairs {
            self.set(key, value);
        }
    }

    /// Merges a sequence of untyped 2-element sequences into `self`,
    /// converting each element into a key and a value via `From`. Fails
    /// with `BadPair` on the first element whose length isn't exactly 2,
    /// mirroring the reference implementation's acceptance of any
    /// iterable of variable-length sequences for `update`.
    pub fn update_from_sequences<I, T>(&self, pairs: I) -> Result<(), MapError>
    where
        I: IntoIterator<Item = Vec<T>>,
        K: From<T>,
        V: From<T>,
    {
        for (index, mut pair) in pairs.into_iter().enumerate() {
            let len = pair.len();
            if len != 2 {
                return Err(MapError::BadPair { index, len });
            }
            let value_raw = pair.pop().expect("length checked above");
            let key_raw = pair.pop().expect("length checked above");
            self.set(K::from(key_raw), V::from(value_raw));
        }
        Ok(())
    }

    /// A map is not hashable — always fails with `Unhashable`. Kept as an
    /// explicit, testable operation (rather than relying solely on the
    /// absence of a `Hash` impl) because the error surface is part of
    /// this crate's documented contract.
    pub fn try_hash(&self) -> Result<u64, MapError> {
        Err(MapError::Unhashable)
    }

    /// Renders every slot's current state (`Empty`, `Tombstone`, or a live
    /// binding), mirroring the reference implementation's `debug` property.
    /// Meant for diagnosing probe/resize behavior, not the steady-state API.
    pub fn debug_slots(&self) -> Vec<String>
    where
        K: fmt::Debug,
        V: fmt::Debug,
    {
        self.with_table(|table| {
            table
                .slots()
                .iter()
                .map(|slot| match slot {
                    Slot::Empty => "Empty".to_string(),
                    Slot::Tombstone => "Tombstone".to_string(),
                    Slot::Live { key, value, .. } => format!("Live({key:?}: {value:?})"),
                })
                .collect()
        })
    }
}

impl<K, V, S> Map<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// A shallow, deep-binding clone: a fresh table with the same
    /// key/value bindings, independently mutable from `self`. Contrast
    /// with [`Clone::clone`], which aliases the same underlying table.
    pub fn copy(&self) -> Map<K, V, S> {
        let table = self.with_table(Table::copy);
        Map { inner: Arc::new(ReentrantMutex::new(RefCell::new(table))) }
    }
}

impl<K, V, S> Map<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    pub fn new() -> Self {
        Map {
            inner: Arc::new(ReentrantMutex::new(RefCell::new(Table::with_hasher_and_config(
                S::default(),
                MapConfig::default(),
            )))),
        }
    }

    pub fn with_hasher(hasher: S) -> Self {
        Map {
            inner: Arc::new(ReentrantMutex::new(RefCell::new(Table::with_hasher_and_config(
                hasher,
                MapConfig::default(),
            )))),
        }
    }

    /// Builds a `Map` with a non-default [`MapConfig`] (the default
    /// hasher). Mainly useful for tests that want to force resize
    /// behavior without inserting thousands of entries.
    pub fn with_config(config: MapConfig) -> Result<Self, MapError> {
        Self::with_hasher_and_config(S::default(), config)
    }

    /// Builds a map where every element of `keys` maps to a clone of
    /// `value`. Duplicate keys collapse, as `set` is idempotent.
    pub fn from_keys<I>(keys: I, value: V) -> Self
    where
        I: IntoIterator<Item = K>,
        V: Clone,
    {
        let map = Self::new();
        for key in keys {
            map.set(key, value.clone());
        }
        map
    }
}

impl<K, V, S> Default for Map<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Order-insensitive structural equality: both maps must have the same
/// domain with equal values on every key.
impl<K, V, S> PartialEq for Map<K, V, S>
where
    K: Hash + Eq + Clone,
    V: PartialEq + Clone,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.with_table(|table| {
            table.slots().iter().all(|slot| match slot {
                Slot::Live { key, value, .. } => {
                    other.with_table(|o| o.get(key).map(|v| v == value)).unwrap_or(false)
                }
                _ => true,
            })
        })
    }
}

impl<K, V, S> Map<K, V, S>
where
    K: Hash + Eq + Clone,
    V: PartialEq + Clone,
    S: BuildHasher,
{
    /// Equivalent to `self == other`; kept as a named method to mirror
    /// the reference implementation's `equals` operation.
    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

impl<K, V, S> fmt::Debug for Map<K, V, S>
where
    K: Hash + Eq + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_table(|table| {
            f.debug_map()
                .entries(table.slots().iter().filter_map(|slot| match slot {
                    Slot::Live { key, value, .. } => Some((key, value)),
                    _ => None,
                }))
                .finish()
        })
    }
}

impl<K, V, S> FromIterator<(K, V)> for Map<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Map::with_hasher(S::default());
        for (key, value) in iter {
            map.set(key, value);
        }
        map
    }
}

/// Builds a map from a sequence of untyped 2-element sequences, mirroring
/// the reference implementation's `dict(iterable_of_pairs)` constructor
/// form. Fails with `BadPair` on the first wrong-length element, exactly
/// like [`Map::update_from_sequences`], which this delegates to.
impl<K, V, S, T> TryFrom<Vec<Vec<T>>> for Map<K, V, S>
where
    K: Hash + Eq + From<T>,
    V: From<T>,
    S: BuildHasher + Default,
{
    type Error = MapError;

    fn try_from(pairs: Vec<Vec<T>>) -> Result<Self, MapError> {
        let map = Self::with_hasher(S::default());
        map.update_from_sequences(pairs)?;
        Ok(map)
    }
}

impl<K, V, S> Extend<(K, V)> for Map<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.update_from_pairs(iter);
    }
}

impl<K, V, S> IntoIterator for &Map<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    type Item = Result<(K, V), MapError>;
    type IntoIter = Entries<K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries_iter()
    }
}
