//! regioncache - TTL cache regions with single-flight async memoization
//!
//! A capacity-bounded, time-expiring backend that can mirror itself to disk,
//! deterministic cache keys for function calls, and a holder type that lets
//! a synchronous cache store the outcome of an async call exactly once per
//! key.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod memo;
pub mod ui;

pub use cache::{
    BackendConfig, CacheArg, CacheBackend, CacheRegion, CallArgs, FnIdentity, KeyGenerator,
    Lookup, TtlBackend,
};
pub use error::{CacheError, CacheResult};
pub use memo::{cache_async, Computation, MemoError, MemoState, Memoized};
