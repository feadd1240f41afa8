//! Single-use handle to an asynchronous body

use crate::error::{CacheError, CacheResult};
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A not-yet-run async body that can be consumed exactly once
///
/// Clones share the body. Whichever clone consumes it first runs it; every
/// later attempt fails with [`CacheError::Reuse`]. Caching a `Computation`
/// directly is therefore a bug that surfaces on the second hit; cache a
/// [`Memoized`](super::Memoized) instead.
pub struct Computation<T, E> {
    body: Arc<Mutex<Option<BoxFuture<'static, Result<T, E>>>>>,
}

impl<T, E> Computation<T, E> {
    /// Wrap an async body without starting it
    pub fn new<F>(body: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            body: Arc::new(Mutex::new(Some(body.boxed()))),
        }
    }

    /// Take the body out, leaving the handle consumed
    pub fn take(&self) -> CacheResult<BoxFuture<'static, Result<T, E>>> {
        self.body.lock().take().ok_or(CacheError::Reuse)
    }

    /// Run the body to completion
    pub async fn run(&self) -> CacheResult<Result<T, E>> {
        let body = self.take()?;
        Ok(body.await)
    }

    /// Whether the body has already been taken
    pub fn is_consumed(&self) -> bool {
        self.body.lock().is_none()
    }
}

impl<T, E> Clone for Computation<T, E> {
    fn clone(&self) -> Self {
        Self {
            body: Arc::clone(&self.body),
        }
    }
}

impl<T, E> fmt::Debug for Computation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
