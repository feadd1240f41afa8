//! CLI command implementations

pub mod config;
pub mod entry;
pub mod inspect;
pub mod maintain;

pub use config::execute as config;
pub use entry::{delete, get};
pub use inspect::execute as inspect;
pub use maintain::{clear, purge, stats};

use crate::cache::snapshot::read_snapshot;
use crate::cache::{BackendConfig, TtlBackend};
use crate::config::{Config, ConfigManager};
use crate::error::CacheResult;
use std::path::{Path, PathBuf};

/// Snapshot values are opaque JSON to the maintenance commands
pub type SnapshotBackend = TtlBackend<serde_json::Value>;

/// Resolve the snapshot path: flag, then config, then the state directory
pub fn snapshot_path(flag: Option<&Path>, config: &Config) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.cache.persistence_path.clone())
        .unwrap_or_else(ConfigManager::default_snapshot_path)
}

/// Open an existing snapshot with the configured TTL
///
/// Unlike backend construction, a missing or unreadable snapshot is an
/// error here: a maintenance command must not silently replace it. The
/// capacity grows to fit every stored entry, since the snapshot may come
/// from an application configured larger than this CLI, and a rewrite must
/// not drop what it never meant to touch.
pub fn open_snapshot(path: &Path, config: &Config) -> CacheResult<SnapshotBackend> {
    let snapshot = read_snapshot::<serde_json::Value>(path)?;

    let configured = config.cache.backend_config()?;
    let capacity = configured.capacity().max(snapshot.entries.len());
    let backend_config = BackendConfig::new(capacity, configured.ttl())?.with_persistence(path);
    Ok(TtlBackend::from_snapshot(backend_config, snapshot))
}
