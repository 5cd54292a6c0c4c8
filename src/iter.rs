//! # Iterators & Views
//!
//! Two distinct traversal surfaces sit atop [`Map`]:
//!
//! - **Iterators** (`Keys`, `Values`, `Entries`) are single-pass and
//!   snapshot-counted: each captures the map's live count at creation and
//!   fails with [`MapError::ConcurrentModification`] the moment a `next()`
//!   call observes that count has changed, exactly like iterating a
//!   CPython `dict` that gets mutated mid-loop. They do not hold the
//!   map's lock between calls to `next()`.
//! - **Views** (`KeysView`, `ValuesView`, `EntriesView`) are live: their
//!   length and membership always reflect the map's current state, and
//!   they support set algebra (`union`, `intersection`, `difference`,
//!   `symmetric_difference`) against any `IntoIterator`, producing a
//!   fresh [`MapSet`].
//!
//! All three iterator/view flavours share one traversal engine
//! (`RawIter`) that walks the slot array and clones out both halves of
//! each live entry; the three public iterator types are thin projections
//! over it, mirroring how the original reference implementation builds
//! `keys()`/`values()`/`items()` as one shared view base class with a
//! different `__iter__` each.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

use crate::error::MapError;
use crate::map::Map;
use crate::table::Slot;

/// Shared traversal engine backing [`Keys`], [`Values`], and [`Entries`].
struct RawIter<K, V, S> {
    map: Map<K, V, S>,
    expected_len: usize,
    next_index: usize,
    emitted: usize,
    done: bool,
}

impl<K, V, S> RawIter<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn new(map: Map<K, V, S>) -> Self {
        let expected_len = map.len();
        RawIter {
            map,
            expected_len,
            next_index: 0,
            emitted: 0,
            done: false,
        }
    }

    fn advance(&mut self) -> Option<Result<(K, V), MapError>> {
        if self.done {
            return None;
        }

        let mut result: Option<Result<(K, V), MapError>> = None;
        let mut index = self.next_index;

        self.map.with_table(|table| {
            if table.len() != self.expected_len {
                result = Some(Err(MapError::ConcurrentModification));
                return;
            }
            let slots = table.slots();
            while index < slots.len() {
                if let Slot::Live { key, value, .. } = &slots[index] {
                    result = Some(Ok((key.clone(), value.clone())));
                    index += 1;
                    return;
                }
                index += 1;
            }
        });

        self.next_index = index;
        match &result {
            Some(Ok(_)) => self.emitted += 1,
            _ => self.done = true,
        }
        result
    }

    fn remaining(&self) -> usize {
        self.expected_len.saturating_sub(self.emitted)
    }
}

macro_rules! snapshot_iterator {
    ($name:ident, $item:ty, $project:expr) => {
        #[doc = concat!(
            "Single-pass, snapshot-counted iterator. See the [module docs](self) ",
            "for the concurrent-modification contract."
        )]
        pub struct $name<K, V, S = RandomState> {
            raw: RawIter<K, V, S>,
        }

        impl<K, V, S> $name<K, V, S>
        where
            K: Hash + Eq + Clone,
            V: Clone,
            S: BuildHasher,
        {
            pub(crate) fn new(map: Map<K, V, S>) -> Self {
                $name { raw: RawIter::new(map) }
            }
        }

        impl<K, V, S> Iterator for $name<K, V, S>
        where
            K: Hash + Eq + Clone,
            V: Clone,
            S: BuildHasher,
        {
            type Item = Result<$item, MapError>;

            fn next(&mut self) -> Option<Self::Item> {
                self.raw.advance().map($project)
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                let remaining = self.raw.remaining();
                (remaining, Some(remaining))
            }
        }

        impl<K, V, S> ExactSizeIterator for $name<K, V, S>
        where
            K: Hash + Eq + Clone,
            V: Clone,
            S: BuildHasher,
        {
            fn len(&self) -> usize {
                self.raw.remaining()
            }
        }
    };
}

snapshot_iterator!(Keys, K, |r: Result<(K, V), MapError>| r.map(|(k, _)| k));
snapshot_iterator!(Values, V, |r: Result<(K, V), MapError>| r.map(|(_, v)| v));
snapshot_iterator!(Entries, (K, V), |r: Result<(K, V), MapError>| r);

/// A materialised result of set algebra over a [`KeysView`], [`ValuesView`],
/// or [`EntriesView`].
///
/// Backed by a deduplicating `Vec` rather than `std::collections::HashSet`:
/// `ValuesView`'s element type is only required to be `PartialEq`
/// (values are not a hashable capability of this map), so the lowest
/// common denominator across all three views is equality-based
/// deduplication, matching the O(n*m) membership tests the original
/// reference implementation performs for its own `__and__`/`__or__`.
#[derive(Debug, Clone)]
pub struct MapSet<T> {
    items: Vec<T>,
}

impl<T: PartialEq> MapSet<T> {
    fn empty() -> Self {
        MapSet { items: Vec::new() }
    }

    fn insert(&mut self, item: T) {
        if !self.items.contains(&item) {
            self.items.push(item);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: PartialEq> FromIterator<T> for MapSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = MapSet::empty();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<T: PartialEq> IntoIterator for MapSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: PartialEq> IntoIterator for &'a MapSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: PartialEq> PartialEq for MapSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len() && self.items.iter().all(|x| other.contains(x))
    }
}

impl<T: PartialEq> Eq for MapSet<T> {}

fn set_union<T: PartialEq>(a: Vec<T>, b: Vec<T>) -> MapSet<T> {
    a.into_iter().chain(b).collect()
}

fn set_intersection<T: PartialEq>(a: Vec<T>, b: Vec<T>) -> MapSet<T> {
    a.into_iter().filter(|x| b.contains(x)).collect()
}

fn set_difference<T: PartialEq>(a: Vec<T>, b: Vec<T>) -> MapSet<T> {
    a.into_iter().filter(|x| !b.contains(x)).collect()
}

fn set_symmetric_difference<T: PartialEq + Clone>(a: Vec<T>, b: Vec<T>) -> MapSet<T> {
    let a_only = a.iter().filter(|x| !b.contains(x)).cloned();
    let b_only = b.iter().filter(|x| !a.contains(x)).cloned();
    a_only.chain(b_only).collect()
}

macro_rules! view {
    ($view:ident, $iter:ident, $item:ty, $project:expr) => {
        #[doc = concat!(
            "A live view over a map's ", stringify!($item),
            " — its length and membership always reflect the map's current ",
            "state, unlike the snapshot-counted [`", stringify!($iter), "`] iterator."
        )]
        pub struct $view<K, V, S = RandomState> {
            map: Map<K, V, S>,
        }

        impl<K, V, S> $view<K, V, S>
        where
            K: Hash + Eq + Clone,
            V: Clone,
            S: BuildHasher,
        {
            pub(crate) fn new(map: Map<K, V, S>) -> Self {
                $view { map }
            }

            /// Number of entries currently in the underlying map.
            pub fn len(&self) -> usize {
                self.map.len()
            }

            pub fn is_empty(&self) -> bool {
                self.map.is_empty()
            }

            /// A fresh, snapshot-counted iterator over the current state.
            pub fn iter(&self) -> $iter<K, V, S> {
                $iter::new(self.map.clone())
            }

            fn materialize(&self) -> Vec<$item> {
                self.iter().filter_map(Result::ok).map($project).collect()
            }
        }

        impl<K, V, S> IntoIterator for $view<K, V, S>
        where
            K: Hash + Eq + Clone,
            V: Clone,
            S: BuildHasher,
        {
            type Item = Result<$item, MapError>;
            type IntoIter = $iter<K, V, S>;
            fn into_iter(self) -> Self::IntoIter {
                $iter::new(self.map)
            }
        }
    };
}

view!(KeysView, Keys, K, |k: (K, V)| k.0);
view!(ValuesView, Values, V, |kv: (K, V)| kv.1);
view!(EntriesView, Entries, (K, V), |kv: (K, V)| kv);

impl<K, V, S> KeysView<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// True iff `key` is live in the underlying map.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains(key)
    }

    pub fn union<I: IntoIterator<Item = K>>(&self, other: I) -> MapSet<K> {
        set_union(self.materialize(), other.into_iter().collect())
    }

    pub fn intersection<I: IntoIterator<Item = K>>(&self, other: I) -> MapSet<K> {
        set_intersection(self.materialize(), other.into_iter().collect())
    }

    pub fn difference<I: IntoIterator<Item = K>>(&self, other: I) -> MapSet<K> {
        set_difference(self.materialize(), other.into_iter().collect())
    }

    pub fn symmetric_difference<I: IntoIterator<Item = K>>(&self, other: I) -> MapSet<K> {
        set_symmetric_difference(self.materialize(), other.into_iter().collect())
    }
}

impl<K, V, S> ValuesView<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    S: BuildHasher,
{
    /// True iff some live value compares equal to `value`. Linear in
    /// `len()`: values are not required to be hashable.
    pub fn contains(&self, value: &V) -> bool {
        self.iter().filter_map(Result::ok).any(|v| &v == value)
    }

    pub fn union<I: IntoIterator<Item = V>>(&self, other: I) -> MapSet<V> {
        set_union(self.materialize(), other.into_iter().collect())
    }

    pub fn intersection<I: IntoIterator<Item = V>>(&self, other: I) -> MapSet<V> {
        set_intersection(self.materialize(), other.into_iter().collect())
    }

    pub fn difference<I: IntoIterator<Item = V>>(&self, other: I) -> MapSet<V> {
        set_difference(self.materialize(), other.into_iter().collect())
    }

    pub fn symmetric_difference<I: IntoIterator<Item = V>>(&self, other: I) -> MapSet<V> {
        set_symmetric_difference(self.materialize(), other.into_iter().collect())
    }
}

impl<K, V, S> EntriesView<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    S: BuildHasher,
{
    pub fn contains(&self, entry: &(K, V)) -> bool {
        self.iter()
            .filter_map(Result::ok)
            .any(|(k, v)| k == entry.0 && v == entry.1)
    }

    pub fn union<I: IntoIterator<Item = (K, V)>>(&self, other: I) -> MapSet<(K, V)> {
        set_union(self.materialize(), other.into_iter().collect())
    }

    pub fn intersection<I: IntoIterator<Item = (K, V)>>(&self, other: I) -> MapSet<(K, V)> {
        set_intersection(self.materialize(), other.into_iter().collect())
    }

    pub fn difference<I: IntoIterator<Item = (K, V)>>(&self, other: I) -> MapSet<(K, V)> {
        set_difference(self.materialize(), other.into_iter().collect())
    }

    pub fn symmetric_difference<I: IntoIterator<Item = (K, V)>>(&self, other: I) -> MapSet<(K, V)> {
        set_symmetric_difference(self.materialize(), other.into_iter().collect())
    }
}
