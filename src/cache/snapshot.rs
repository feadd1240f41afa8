//! On-disk snapshot of a backend's table
//!
//! The whole table is written as one JSON document on every mutation and
//! read back once at startup. Entries are stored least-recently-used first
//! so recency survives a restart.

use crate::error::{CacheError, CacheResult};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// A persisted table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<R> {
    /// Format version, checked on load
    pub version: u32,
    /// Entries in recency order, oldest first
    pub entries: Vec<SnapshotEntry<R>>,
}

/// A persisted entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry<R> {
    pub key: String,
    pub value: R,
    pub inserted_at: DateTime<Utc>,
}

impl<R> Snapshot<R> {
    /// Snapshot of the given entries at the current version
    pub fn new(entries: Vec<SnapshotEntry<R>>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries,
        }
    }
}

impl<R> Default for Snapshot<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Read a snapshot file
///
/// A missing file is reported as [`CacheError::SnapshotNotFound`]; the
/// caller decides whether that is fatal.
pub fn read_snapshot<R: DeserializeOwned>(path: &Path) -> CacheResult<Snapshot<R>> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CacheError::SnapshotNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(CacheError::io(
                format!("reading cache snapshot {}", path.display()),
                e,
            ))
        }
    };

    let snapshot: Snapshot<R> =
        serde_json::from_slice(&content).map_err(|e| CacheError::SnapshotInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(CacheError::SnapshotInvalid {
            path: path.to_path_buf(),
            reason: format!(
                "unsupported version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            ),
        });
    }

    debug!(
        "Read {} entries from snapshot {}",
        snapshot.entries.len(),
        path.display()
    );
    Ok(snapshot)
}

/// Replace the snapshot file with `snapshot`
///
/// Writes a sibling temp file and renames it over the target, so a crash
/// mid-write leaves the previous snapshot intact.
pub fn write_snapshot<R: Serialize>(path: &Path, snapshot: &Snapshot<R>) -> CacheResult<()> {
    let content = serde_json::to_vec(snapshot)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CacheError::persist(path, e))?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, content).map_err(|e| CacheError::persist(path, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        CacheError::persist(path, e)
    })?;

    debug!(
        "Wrote {} entries to snapshot {}",
        snapshot.entries.len(),
        path.display()
    );
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
