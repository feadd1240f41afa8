//! Cache backend, key derivation and regions
//!
//! # Flow
//!
//! | Step | Component |
//! |------|-----------|
//! | Derive key from call | [`KeyGenerator`] |
//! | Look up key | [`CacheBackend::get`] |
//! | On miss, call and store | [`CacheRegion::get_or_create`] |
//! | On hit, return stored value | [`CacheRegion::get_or_create`] |
//!
//! For async functions the stored value is a
//! [`Memoized`](crate::memo::Memoized) holder, never the future itself.

pub mod backend;
pub mod clock;
pub mod key;
pub mod region;
pub mod snapshot;
pub mod ttl;

pub use backend::{CacheBackend, Durable, Lookup};
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{CacheArg, CallArgs, CallKind, FnIdentity, KeyGenerator};
pub use region::CacheRegion;
pub use ttl::{BackendConfig, CacheStats, EntryInfo, TtlBackend};
