//! Error types for the map's public operations.

use thiserror::Error;

/// Errors returned by [`crate::Map`] operations.
///
/// Every public operation that can fail returns one of these variants;
/// there is no local retry and the map's internal lock is always released
/// before the error reaches the caller, so a failed operation never
/// leaves the map in a partially mutated state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    /// `get`, `delete`, or `pop` was called for a key that is not present
    /// and no default was supplied.
    #[error("key not found")]
    KeyNotFound,

    /// `pop_arbitrary` was called on a map with no live entries.
    #[error("map is empty")]
    EmptyMap,

    /// `update` received a sequence element whose length was not 2.
    #[error("update sequence element #{index} has length {len}; 2 is required")]
    BadPair {
        /// Position of the offending element in the input sequence.
        index: usize,
        /// The element's actual length.
        len: usize,
    },

    /// An iterator observed that the map's live count changed since it was
    /// created; restart iteration to recover.
    #[error("map mutated during iteration")]
    ConcurrentModification,

    /// The map itself was used as a key — maps are not hashable.
    #[error("unhashable type: 'Map'")]
    Unhashable,

    /// A [`crate::table::MapConfig`] failed validation at construction time.
    #[error("invalid map configuration: {0}")]
    InvalidConfig(&'static str),
}
