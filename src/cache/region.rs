//! Cache regions: a backend plus the get-or-create protocol around it
//!
//! A region is constructed once at startup and passed by reference to
//! whoever caches through it. There is no process-wide region registry.

use crate::cache::backend::{CacheBackend, Durable};
use crate::cache::key::{CallArgs, FnIdentity, KeyGenerator};
use crate::cache::ttl::TtlBackend;
use crate::config::schema::CacheSettings;
use crate::error::CacheResult;
use crate::memo::Memoized;
use std::future::Future;
use std::marker::PhantomData;
use tracing::debug;

/// Named cache region over a backend
pub struct CacheRegion<V, B = TtlBackend<V>> {
    name: String,
    namespace: Option<String>,
    backend: B,
    _values: PhantomData<fn() -> V>,
}

impl<V, B> CacheRegion<V, B>
where
    V: Clone,
    B: CacheBackend<V>,
{
    /// Create a region over `backend`
    pub fn new(name: impl Into<String>, backend: B) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            backend,
            _values: PhantomData,
        }
    }

    /// Namespace applied to key generators built by this region
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Key generator for a plain function in this region's namespace
    pub fn function_keys(&self, id: FnIdentity) -> KeyGenerator {
        KeyGenerator::function(self.namespace(), id)
    }

    /// Key generator for a method in this region's namespace
    ///
    /// See [`KeyGenerator::method`] for the purity requirement.
    pub fn method_keys(&self, id: FnIdentity) -> KeyGenerator {
        KeyGenerator::method(self.namespace(), id)
    }

    /// Return the cached value for `key`, creating and storing it on a miss
    ///
    /// On a hit the stored value is returned untouched and `create` is not
    /// called. Callers racing on the same missing key, from any thread, get
    /// the value of one `create` call. If storing the new value cannot be
    /// made durable the error is returned; the value is still resident in
    /// memory.
    pub fn get_or_create<F>(&self, key: &str, create: F) -> CacheResult<V>
    where
        F: FnOnce() -> V,
    {
        let mut created = false;
        let value = self.backend.get_or_insert_with(key, || {
            created = true;
            create()
        })?;

        if created {
            debug!("Region {} miss for {}", self.name, key);
        } else {
            debug!("Region {} hit for {}", self.name, key);
        }
        Ok(value)
    }

    /// Derive the key for `args`, then [`get_or_create`](Self::get_or_create)
    pub fn cached<F>(&self, keys: &KeyGenerator, args: &CallArgs, create: F) -> CacheResult<V>
    where
        F: FnOnce() -> V,
    {
        let key = keys.generate(args)?;
        self.get_or_create(&key, create)
    }

    /// Drop the entry for `key`
    pub fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.backend.delete(key)
    }

    /// Rewrite the backend's snapshot, if it keeps one
    pub fn flush(&self) -> CacheResult<()> {
        self.backend.flush()
    }
}

impl<T, E, B> CacheRegion<Memoized<T, E>, B>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    B: CacheBackend<Memoized<T, E>>,
{
    /// Cache the holder for an async call
    ///
    /// On a miss `call` is invoked to bind the body, which does not start
    /// until the returned holder is first awaited. Concurrent callers for the
    /// same key all receive the same holder.
    ///
    /// The holder is stored while still pending, and a pending holder has
    /// nothing to write to disk. Its result reaches the snapshot with the
    /// next mutation of the backend or an explicit [`flush`](Self::flush).
    pub fn memoized<F, Fut>(
        &self,
        keys: &KeyGenerator,
        args: &CallArgs,
        call: F,
    ) -> CacheResult<Memoized<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.cached(keys, args, || Memoized::new(call()))
    }
}

impl<V> CacheRegion<V, TtlBackend<V>>
where
    V: Durable + Clone + Send,
{
    /// Build a region with a [`TtlBackend`] from settings
    pub fn from_settings(name: impl Into<String>, settings: &CacheSettings) -> CacheResult<Self> {
        let backend = TtlBackend::new(settings.backend_config()?);
        let region = Self::new(name, backend);
        Ok(match &settings.namespace {
            Some(ns) => region.with_namespace(ns.clone()),
            None => region,
        })
    }
}
