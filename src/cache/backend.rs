//! Pluggable cache backend interface
//!
//! Backends are synchronous: `get`, `set` and `delete` never suspend. A miss
//! is reported as [`Lookup::NotFound`], not as an error.

use crate::error::CacheResult;
use serde::{de::DeserializeOwned, Serialize};

/// Result of a backend lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    /// A live entry was found
    Found(V),
    /// The key is absent or its entry has expired
    NotFound,
}

impl<V> Lookup<V> {
    /// Convert into an `Option`
    pub fn into_option(self) -> Option<V> {
        match self {
            Self::Found(v) => Some(v),
            Self::NotFound => None,
        }
    }

    /// Whether this lookup is a hit
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl<V> From<Option<V>> for Lookup<V> {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}

/// Cache backend trait for pluggable cache implementations
///
/// Implementations must be thread-safe: every mutation is serialized,
/// including any persistence write it triggers.
pub trait CacheBackend<V>: Send + Sync {
    /// Look up a key, treating a stale entry as a miss
    fn get(&self, key: &str) -> Lookup<V>;

    /// Insert or overwrite a key
    ///
    /// The in-memory mutation always happens. An error means the mutation
    /// could not be made durable.
    fn set(&self, key: &str, value: V) -> CacheResult<()>;

    /// Return the live value for `key`, storing `create()` on a miss
    ///
    /// Lookup and insert are one step: concurrent callers that miss the
    /// same key all receive the value of a single `create` call. `create`
    /// runs while the backend is locked and must not call back into it.
    fn get_or_insert_with<F>(&self, key: &str, create: F) -> CacheResult<V>
    where
        F: FnOnce() -> V;

    /// Remove a key if present
    fn delete(&self, key: &str) -> CacheResult<()>;

    /// Number of resident entries, stale ones included
    fn len(&self) -> usize;

    /// Whether no entries are resident
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry
    fn clear(&self) -> CacheResult<()>;

    /// Make the current table durable, for backends that persist
    fn flush(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Values that can be written to and restored from a snapshot
///
/// `to_repr` returns `None` for values that have no data representation
/// yet (an unresolved computation); such entries are left out of the
/// snapshot.
pub trait Durable: Sized {
    /// On-disk representation
    type Repr: Serialize + DeserializeOwned;

    /// Representation to persist, if any
    fn to_repr(&self) -> Option<Self::Repr>;

    /// Rebuild a value from its persisted representation
    fn from_repr(repr: Self::Repr) -> Self;
}

macro_rules! durable_as_self {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Durable for $ty {
                type Repr = $ty;

                fn to_repr(&self) -> Option<Self::Repr> {
                    Some(self.clone())
                }

                fn from_repr(repr: Self::Repr) -> Self {
                    repr
                }
            }
        )+
    };
}

durable_as_self!(
    String,
    bool,
    i32,
    i64,
    u32,
    u64,
    f64,
    Vec<u8>,
    Vec<String>,
    serde_json::Value,
);
