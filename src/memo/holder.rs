//! Re-awaitable, single-assignment result holder
//!
//! # States
//!
//! | State | Meaning |
//! |-------|---------|
//! | Pending | Body bound but not started |
//! | InFlight | First consumer started the body; others wait on it |
//! | Done | Outcome recorded; every consumer gets a clone of it |
//!
//! The pending to in-flight claim happens under the holder's lock, so two
//! consumers arriving together still start the body once. The body runs as
//! a spawned tokio task: dropping a consumer never cancels it, and an
//! aborted or panicking task is recorded as an error outcome instead of
//! leaving the holder in flight. Awaiting a pending holder outside a
//! runtime returns [`MemoError::NoRuntime`] and leaves the body unstarted.

use crate::cache::backend::Durable;
use crate::memo::computation::Computation;
use crate::memo::MemoError;
use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::any::Any;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::debug;

/// Outcome of a memoized computation
pub type Outcome<T, E> = Result<T, MemoError<E>>;

type Flight<T, E> = Shared<BoxFuture<'static, Outcome<T, E>>>;

/// Observable lifecycle of a [`Memoized`] holder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    Pending,
    InFlight,
    Done,
}

enum Cell<T, E> {
    Pending(Computation<T, E>),
    InFlight(Flight<T, E>),
    Done(Outcome<T, E>),
}

enum Step<T, E> {
    Ready(Outcome<T, E>),
    Wait(Flight<T, E>),
}

/// Cacheable stand-in for the result of an async call
///
/// Store the holder, not the future, in a cache. Every clone refers to the
/// same state, and awaiting any of them any number of times runs the body
/// at most once. Must be awaited from within a tokio runtime.
pub struct Memoized<T, E> {
    cell: Arc<Mutex<Cell<T, E>>>,
}

impl<T, E> Memoized<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Bind an async body without starting it
    pub fn new<F>(body: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::from_computation(Computation::new(body))
    }

    /// Bind an existing single-use handle
    ///
    /// If the handle is consumed elsewhere before this holder claims it, the
    /// holder resolves to [`MemoError::Reused`].
    pub fn from_computation(computation: Computation<T, E>) -> Self {
        Self::with_cell(Cell::Pending(computation))
    }

    /// A holder that is already done with `value`
    pub fn resolved(value: T) -> Self {
        Self::with_cell(Cell::Done(Ok(value)))
    }

    fn with_cell(cell: Cell<T, E>) -> Self {
        Self {
            cell: Arc::new(Mutex::new(cell)),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> MemoState {
        match &*self.cell.lock() {
            Cell::Pending(_) => MemoState::Pending,
            Cell::InFlight(_) => MemoState::InFlight,
            Cell::Done(_) => MemoState::Done,
        }
    }

    /// The recorded outcome, once done
    pub fn peek(&self) -> Option<Outcome<T, E>> {
        match &*self.cell.lock() {
            Cell::Done(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Whether two handles share the same holder
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Wait for the outcome, starting the body if nobody has yet
    pub async fn get(&self) -> Outcome<T, E> {
        match self.claim() {
            Step::Ready(outcome) => outcome,
            Step::Wait(flight) => {
                let outcome = flight.await;
                self.record(&outcome);
                outcome
            }
        }
    }

    fn claim(&self) -> Step<T, E> {
        let mut cell = self.cell.lock();
        let flight = match &*cell {
            Cell::Done(outcome) => return Step::Ready(outcome.clone()),
            Cell::InFlight(flight) => return Step::Wait(flight.clone()),
            Cell::Pending(computation) => {
                let Ok(runtime) = Handle::try_current() else {
                    debug!("Memoized computation awaited outside a runtime, left pending");
                    return Step::Ready(Err(MemoError::NoRuntime));
                };
                launch(&runtime, computation)
            }
        };
        *cell = Cell::InFlight(flight.clone());
        debug!("Memoized computation claimed");
        Step::Wait(flight)
    }

    fn record(&self, outcome: &Outcome<T, E>) {
        let mut cell = self.cell.lock();
        if matches!(&*cell, Cell::InFlight(_)) {
            *cell = Cell::Done(outcome.clone());
            debug!("Memoized computation done (ok: {})", outcome.is_ok());
        }
    }
}

fn launch<T, E>(runtime: &Handle, computation: &Computation<T, E>) -> Flight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let body = match computation.take() {
        Ok(body) => body,
        Err(_) => return future::ready(Err(MemoError::Reused)).boxed().shared(),
    };

    let task = runtime.spawn(body);
    async move {
        match task.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(MemoError::Failed(e)),
            Err(join) if join.is_cancelled() => Err(MemoError::Cancelled),
            Err(join) => Err(MemoError::Panicked(panic_message(join.into_panic()))),
        }
    }
    .boxed()
    .shared()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<T, E> Clone for Memoized<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T, E> fmt::Debug for Memoized<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.cell.lock() {
            Cell::Pending(_) => "pending",
            Cell::InFlight(_) => "in_flight",
            Cell::Done(Ok(_)) => "done",
            Cell::Done(Err(_)) => "done(error)",
        };
        f.debug_struct("Memoized").field("state", &state).finish()
    }
}

impl<T, E> IntoFuture for Memoized<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = Outcome<T, E>;
    type IntoFuture = BoxFuture<'static, Outcome<T, E>>;

    fn into_future(self) -> Self::IntoFuture {
        async move { self.get().await }.boxed()
    }
}

impl<'a, T, E> IntoFuture for &'a Memoized<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = Outcome<T, E>;
    type IntoFuture = BoxFuture<'a, Outcome<T, E>>;

    fn into_future(self) -> Self::IntoFuture {
        self.get().boxed()
    }
}

/// Only a successful result is persisted; a reload yields a done holder
impl<T, E> Durable for Memoized<T, E>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Repr = T;

    fn to_repr(&self) -> Option<T> {
        match self.peek() {
            Some(Ok(value)) => Some(value),
            _ => None,
        }
    }

    fn from_repr(repr: T) -> Self {
        Self::resolved(repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counted(calls: &Arc<AtomicUsize>, value: &str) -> Memoized<String, Infallible> {
        let calls = Arc::clone(calls);
        let value = value.to_string();
        Memoized::new(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(value)
        })
    }

    #[tokio::test]
    async fn awaits_repeatedly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let holder = counted(&calls, "test");

        assert_eq!(holder.state(), MemoState::Pending);
        assert_eq!((&holder).await.unwrap(), "test");
        assert_eq!((&holder).await.unwrap(), "test");
        assert_eq!(holder.clone().await.unwrap(), "test");
        assert_eq!(holder.state(), MemoState::Done);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_consumers_share_one_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let holder = counted(&calls, "a");
        let other = holder.clone();

        let (a, b) = tokio::join!(holder.get(), other.get());

        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn consumers_on_many_tasks_share_one_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let holder = counted(&calls, "x");

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let holder = holder.clone();
                tokio::spawn(async move { holder.get().await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "x");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_recorded_and_replayed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let holder: Memoized<u32, String> = Memoized::new(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("boom".to_string())
        });

        assert_eq!(holder.get().await, Err(MemoError::Failed("boom".to_string())));
        assert_eq!(holder.get().await, Err(MemoError::Failed("boom".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panic_is_recorded_as_error() {
        let holder: Memoized<u32, Infallible> = Memoized::new(async {
            if true {
                panic!("exploded");
            }
            Ok(1)
        });

        assert_eq!(
            holder.get().await,
            Err(MemoError::Panicked("exploded".to_string()))
        );
        assert_eq!(holder.state(), MemoState::Done);
    }

    #[tokio::test]
    async fn dropped_consumer_does_not_cancel_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let holder = counted(&calls, "slow");

        let first = tokio::time::timeout(Duration::from_millis(1), holder.get()).await;
        assert!(first.is_err());
        assert_eq!(holder.state(), MemoState::InFlight);

        assert_eq!(holder.get().await.unwrap(), "slow");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_shutdown_records_cancellation() {
        let holder: Memoized<u32, Infallible> = Memoized::new(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(1)
        });

        let first = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        first.block_on(async {
            let attempt = tokio::time::timeout(Duration::from_millis(1), holder.get()).await;
            assert!(attempt.is_err());
        });
        drop(first);

        let second = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let outcome = second.block_on(holder.get());
        assert_eq!(outcome, Err(MemoError::Cancelled));
        assert_eq!(holder.peek(), Some(Err(MemoError::Cancelled)));
    }

    #[test]
    fn outside_runtime_leaves_body_unstarted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let holder = counted(&calls, "later");

        assert_eq!(holder.get().now_or_never(), Some(Err(MemoError::NoRuntime)));
        assert_eq!(holder.state(), MemoState::Pending);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        assert_eq!(runtime.block_on(holder.get()).unwrap(), "later");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn consumed_computation_resolves_to_reused() {
        let computation = Computation::new(async { Ok::<_, Infallible>(1u8) });
        let holder = Memoized::from_computation(computation.clone());

        computation.run().await.unwrap().unwrap();
        assert_eq!(holder.get().await, Err(MemoError::Reused));
    }

    #[test]
    fn durable_repr_only_for_success() {
        let pending: Memoized<String, Infallible> = Memoized::new(async { Ok("v".to_string()) });
        assert_eq!(pending.to_repr(), None);

        let done: Memoized<String, Infallible> = Memoized::resolved("v".to_string());
        assert_eq!(done.to_repr(), Some("v".to_string()));

        let restored = Memoized::<String, Infallible>::from_repr("w".to_string());
        assert_eq!(restored.peek(), Some(Ok("w".to_string())));
    }
}
