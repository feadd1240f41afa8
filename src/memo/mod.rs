//! Single-flight memoization of async calls
//!
//! A cache region stores whatever the wrapped function returns, right away.
//! For an async function that is an unstarted future, which can only be
//! consumed once and cannot be written to disk. [`cache_async`] makes the
//! function return a [`Memoized`] holder instead: the region caches the
//! holder, every caller gets a clone of it, and the body runs at most once
//! per holder no matter how many callers await it.
//!
//! ```no_run
//! use regioncache::memo::cache_async;
//! use std::convert::Infallible;
//!
//! # async fn demo() {
//! let fetch = cache_async(|id: u64| async move { Ok::<_, Infallible>(id * 2) });
//! let holder = fetch(21);
//! assert_eq!(holder.get().await, Ok(42));
//! assert_eq!(holder.get().await, Ok(42));
//! # }
//! ```

pub mod computation;
pub mod holder;

pub use computation::Computation;
pub use holder::{MemoState, Memoized, Outcome};

use std::future::Future;
use thiserror::Error;

/// Error outcome recorded by a [`Memoized`] holder
///
/// Cloned out to every consumer, so all of them observe the same failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoError<E> {
    /// The body returned an error
    #[error("{0}")]
    Failed(E),

    /// The task running the body was cancelled
    #[error("Memoized computation was cancelled")]
    Cancelled,

    /// The body panicked
    #[error("Memoized computation panicked: {0}")]
    Panicked(String),

    /// The bound computation handle had already been consumed
    #[error("Computation handle was already consumed and cannot be awaited again")]
    Reused,

    /// Awaited outside a tokio runtime; the body was not started
    #[error("Memoized computation must be awaited inside a tokio runtime")]
    NoRuntime,
}

impl<E> MemoError<E> {
    /// The body's own error, if that is what was recorded
    pub fn into_failed(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Make an async function return a cacheable [`Memoized`] holder
///
/// The returned function binds the call without starting it.
pub fn cache_async<A, F, Fut, T, E>(f: F) -> impl Fn(A) -> Memoized<T, E>
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    move |args| Memoized::new(f(args))
}
