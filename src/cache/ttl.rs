//! Capacity-bounded, time-expiring backend with optional disk mirror
//!
//! # Eviction
//!
//! | Trigger | When | Victim |
//! |---------|------|--------|
//! | Capacity | `set` of a new key on a full table | Least recently used entry |
//! | Expiry | `get` of an entry aged `>= ttl` | That entry |
//!
//! There is no background sweep. Stale entries stay resident, never served,
//! until they are looked up, pushed out by capacity, or purged explicitly.
//!
//! # Persistence
//!
//! With a `persistence_path`, the snapshot is read once at construction and
//! rewritten after every `set`/`delete`. A missing or unreadable snapshot
//! starts the backend empty. A failed write is returned to the caller.

use crate::cache::backend::{CacheBackend, Durable, Lookup};
use crate::cache::clock::{Clock, SystemClock};
use crate::cache::snapshot::{read_snapshot, write_snapshot, Snapshot, SnapshotEntry};
use crate::error::{CacheError, CacheResult};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Backend configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    capacity: usize,
    ttl: Duration,
    persistence_path: Option<PathBuf>,
}

impl BackendConfig {
    /// In-memory configuration; `capacity` and `ttl` must be positive
    pub fn new(capacity: usize, ttl: Duration) -> CacheResult<Self> {
        if capacity == 0 {
            return Err(CacheError::config("backend", "capacity must be positive"));
        }
        if ttl <= Duration::zero() {
            return Err(CacheError::config("backend", "ttl must be positive"));
        }
        Ok(Self {
            capacity,
            ttl,
            persistence_path: None,
        })
    }

    /// Mirror the table to `path`
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Self {
        self.persistence_path = Some(path.into());
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn persistence_path(&self) -> Option<&Path> {
        self.persistence_path.as_deref()
    }
}

/// Statistics about backend usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups that returned `NotFound`, stale hits included
    pub misses: u64,
    /// Entries removed to make room
    pub evictions: u64,
    /// Entries removed because they were stale
    pub expirations: u64,
    /// Entries currently resident
    pub entries: usize,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A resident entry as seen from outside the backend
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo<V> {
    pub key: String,
    pub value: V,
    pub inserted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
}

struct Slot<V> {
    value: V,
    inserted_at: DateTime<Utc>,
    used: u64,
}

/// Table plus recency index; `recency` maps use tick to key, oldest first
struct Table<V> {
    entries: HashMap<String, Slot<V>>,
    recency: BTreeMap<u64, String>,
    tick: u64,
    stats: CacheStats,
}

impl<V> Table<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(slot) = self.entries.get_mut(key) {
            self.recency.remove(&slot.used);
            slot.used = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn insert(&mut self, key: &str, value: V, inserted_at: DateTime<Utc>) {
        if let Some(slot) = self.entries.get_mut(key) {
            slot.value = value;
            slot.inserted_at = inserted_at;
            self.touch(key);
            return;
        }

        let tick = self.next_tick();
        self.recency.insert(tick, key.to_string());
        self.entries.insert(
            key.to_string(),
            Slot {
                value,
                inserted_at,
                used: tick,
            },
        );
    }

    fn remove(&mut self, key: &str) -> Option<Slot<V>> {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&slot.used);
        Some(slot)
    }

    fn pop_lru(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    /// Slots in recency order, oldest first
    fn ordered(&self) -> impl Iterator<Item = (&String, &Slot<V>)> {
        self.recency
            .values()
            .filter_map(move |key| self.entries.get_key_value(key))
    }
}

/// Time-to-live backend with least-recently-used capacity eviction
pub struct TtlBackend<V> {
    config: BackendConfig,
    clock: Arc<dyn Clock>,
    table: Mutex<Table<V>>,
}

impl<V: Durable + Clone> TtlBackend<V> {
    /// Create a backend on the wall clock, loading any existing snapshot
    pub fn new(config: BackendConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a backend on a custom clock, loading any existing snapshot
    pub fn with_clock(config: BackendConfig, clock: Arc<dyn Clock>) -> Self {
        let table = match config.persistence_path() {
            Some(path) => Self::load(path, config.capacity),
            None => Table::new(),
        };

        Self {
            config,
            clock,
            table: Mutex::new(table),
        }
    }

    /// Create a backend on the wall clock from a snapshot already read
    ///
    /// The configured persistence path is not read again. Entries beyond
    /// capacity are dropped oldest first, as on a normal load.
    pub fn from_snapshot(config: BackendConfig, snapshot: Snapshot<V::Repr>) -> Self {
        let table = Self::restore(snapshot, config.capacity);
        Self {
            config,
            clock: Arc::new(SystemClock),
            table: Mutex::new(table),
        }
    }

    fn load(path: &Path, capacity: usize) -> Table<V> {
        let snapshot: Snapshot<V::Repr> = match read_snapshot(path) {
            Ok(snapshot) => snapshot,
            Err(CacheError::SnapshotNotFound(_)) => {
                debug!("No cache snapshot at {}, starting empty", path.display());
                return Table::new();
            }
            Err(e) => {
                warn!("Ignoring unreadable cache snapshot: {}", e);
                return Table::new();
            }
        };

        let table = Self::restore(snapshot, capacity);
        debug!(
            "Loaded {} cache entries from {}",
            table.entries.len(),
            path.display()
        );
        table
    }

    fn restore(snapshot: Snapshot<V::Repr>, capacity: usize) -> Table<V> {
        let mut table = Table::new();
        let skip = snapshot.entries.len().saturating_sub(capacity);
        if skip > 0 {
            warn!("Snapshot holds more than {} entries, dropping the {} oldest", capacity, skip);
        }
        for entry in snapshot.entries.into_iter().skip(skip) {
            table.insert(&entry.key, V::from_repr(entry.value), entry.inserted_at);
        }
        table
    }

    /// Lazy-expiring lookup; caller holds the lock
    fn lookup(&self, table: &mut Table<V>, key: &str, now: DateTime<Utc>) -> Lookup<V> {
        let Some(slot) = table.entries.get(key) else {
            table.stats.misses += 1;
            return Lookup::NotFound;
        };

        if self.is_stale(slot.inserted_at, now) {
            table.remove(key);
            table.stats.expirations += 1;
            table.stats.misses += 1;
            debug!("Cache entry {} expired", key);
            return Lookup::NotFound;
        }

        let value = slot.value.clone();
        table.touch(key);
        table.stats.hits += 1;
        Lookup::Found(value)
    }

    /// Insert with capacity eviction; caller holds the lock
    fn store(&self, table: &mut Table<V>, key: &str, value: V, now: DateTime<Utc>) {
        if !table.entries.contains_key(key) {
            while table.entries.len() >= self.config.capacity {
                match table.pop_lru() {
                    Some(evicted) => {
                        table.stats.evictions += 1;
                        debug!("Evicted least recently used cache entry {}", evicted);
                    }
                    None => break,
                }
            }
        }
        table.insert(key, value, now);
    }

    /// Backend configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn is_stale(&self, inserted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - inserted_at >= self.config.ttl
    }

    /// Write the snapshot if persistence is configured; caller holds the lock
    fn persist(&self, table: &Table<V>) -> CacheResult<()> {
        let Some(path) = self.config.persistence_path() else {
            return Ok(());
        };

        let entries = table
            .ordered()
            .filter_map(|(key, slot)| {
                slot.value.to_repr().map(|value| SnapshotEntry {
                    key: key.clone(),
                    value,
                    inserted_at: slot.inserted_at,
                })
            })
            .collect();

        write_snapshot(path, &Snapshot::new(entries))
    }

    /// Remove all stale entries, returning how many were dropped
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let now = self.clock.now();
        let mut table = self.table.lock();

        let stale: Vec<String> = table
            .entries
            .iter()
            .filter(|(_, slot)| self.is_stale(slot.inserted_at, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            table.remove(key);
        }
        table.stats.expirations += stale.len() as u64;

        if !stale.is_empty() {
            debug!("Purged {} expired cache entries", stale.len());
            self.persist(&table)?;
        }
        Ok(stale.len())
    }

    /// Resident entries in recency order, oldest first, without touching them
    pub fn entries(&self) -> Vec<EntryInfo<V>> {
        let now = self.clock.now();
        let table = self.table.lock();

        table
            .ordered()
            .map(|(key, slot)| EntryInfo {
                key: key.clone(),
                value: slot.value.clone(),
                inserted_at: slot.inserted_at,
                expires_at: slot
                    .inserted_at
                    .checked_add_signed(self.config.ttl)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
                expired: self.is_stale(slot.inserted_at, now),
            })
            .collect()
    }

    /// Usage counters
    pub fn stats(&self) -> CacheStats {
        let table = self.table.lock();
        CacheStats {
            entries: table.entries.len(),
            ..table.stats.clone()
        }
    }
}

impl<V> CacheBackend<V> for TtlBackend<V>
where
    V: Durable + Clone + Send,
{
    fn get(&self, key: &str) -> Lookup<V> {
        let now = self.clock.now();
        let mut table = self.table.lock();
        self.lookup(&mut table, key, now)
    }

    fn set(&self, key: &str, value: V) -> CacheResult<()> {
        let now = self.clock.now();
        let mut table = self.table.lock();
        self.store(&mut table, key, value, now);
        self.persist(&table)
    }

    fn get_or_insert_with<F>(&self, key: &str, create: F) -> CacheResult<V>
    where
        F: FnOnce() -> V,
    {
        let now = self.clock.now();
        let mut table = self.table.lock();

        if let Lookup::Found(value) = self.lookup(&mut table, key, now) {
            return Ok(value);
        }

        let value = create();
        self.store(&mut table, key, value.clone(), now);
        self.persist(&table)?;
        Ok(value)
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        let mut table = self.table.lock();
        if table.remove(key).is_some() {
            debug!("Deleted cache entry {}", key);
        }
        self.persist(&table)
    }

    fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    fn clear(&self) -> CacheResult<()> {
        let mut table = self.table.lock();
        table.clear();
        self.persist(&table)
    }

    /// Rewrite the snapshot from the current table
    ///
    /// Values that had no persistable form at their last write (a memoized
    /// computation still in flight) are picked up once they resolve.
    fn flush(&self) -> CacheResult<()> {
        let table = self.table.lock();
        self.persist(&table)
    }
}
