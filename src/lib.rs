//! # perturbmap
//!
//! An in-memory hash map using **open addressing**, **tombstone-based
//! deletion**, and **perturbation probing** — a faithful reimplementation
//! of CPython's classic (pre-3.6, pre-insertion-ordered) `dict`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                       Map<K, V, S>                    │
//! │   Arc<ReentrantMutex<RefCell<Table<K, V, S>>>>        │
//! │  ┌──────────────────────────────────────────────────┐ │
//! │  │                     Table                        │ │
//! │  │  flat Vec<Slot<K, V>>: Empty | Tombstone | Live   │ │
//! │  │  probe = perturbation sequence, folded by `mask`  │ │
//! │  │  resize = grow x4/x2 or tombstone-purging rebuild │ │
//! │  └──────────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────┘
//!            │ live                      │ snapshot-counted
//!            ▼                           ▼
//!   KeysView / ValuesView /     Keys / Values / Entries
//!   EntriesView (set algebra)   (ConcurrentModification)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`table`] | The slot array, probe sequence, and grow/shrink policy — the entire intellectual content of this crate |
//! | [`map`] | The public `Map` type: `set`, `get`, `delete`, `pop`, `update`, `copy`, equality |
//! | [`iter`] | Snapshot iterators (`Keys`/`Values`/`Entries`) and live views with set algebra |
//! | [`error`] | The `MapError` error surface |
//!
//! ## Key properties
//!
//! - **Open addressing with tombstones** — deletions mark a slot as a
//!   tombstone rather than physically vacating it, preserving the probe
//!   chains of keys that were displaced past it by a prior collision.
//! - **Perturbation probing** — the probe step mixes the full hash back
//!   in via a right-shifting accumulator, so keys colliding in the low
//!   `log2(capacity)` bits diverge quickly; it degenerates to a
//!   guaranteed-covering linear recurrence once the accumulator hits zero.
//! - **Adaptive sizing** — growth quadruples capacity below 50,000 live
//!   entries and doubles it above; shrinkage is considered only after a
//!   delete, watermarked against the capacity the table last grew to.
//! - **Single reentrant mutex** — every public operation holds one
//!   [`parking_lot::ReentrantMutex`] for its full duration; reentrancy is
//!   required because a resize triggered mid-insert re-enters the
//!   table's own insertion primitive on the same thread.
//!
//! ## Quick start
//!
//! ```rust
//! use perturbmap::Map;
//!
//! let map: Map<String, i64> = Map::new();
//! map.set("a".to_string(), 1);
//! map.set("b".to_string(), 2);
//!
//! assert_eq!(map.get(&"a".to_string()), Ok(1));
//! assert_eq!(map.len(), 2);
//!
//! map.delete(&"a".to_string()).unwrap();
//! assert!(!map.contains(&"a".to_string()));
//!
//! let copy = map.copy();
//! assert_eq!(copy, map);
//! ```

#![allow(dead_code)]

pub mod error;
pub mod iter;
pub mod map;
pub mod table;

pub use error::MapError;
pub use iter::{Entries, EntriesView, Keys, KeysView, MapSet, Values, ValuesView};
pub use map::Map;
pub use table::MapConfig;
