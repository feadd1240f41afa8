//! Error types for regioncache
//!
//! All fallible operations return `CacheResult<T>`. The async memoization
//! path records its own cloneable [`MemoError`](crate::memo::MemoError)
//! because one outcome is handed to every consumer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for regioncache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in regioncache
#[derive(Error, Debug)]
pub enum CacheError {
    // Key derivation errors
    #[error("Keyword arguments are not supported in cache keys: {}", keywords.join(", "))]
    UnsupportedArguments { keywords: Vec<String> },

    #[error("Method {function} was called without a receiver argument")]
    MissingReceiver { function: String },

    // Memoization errors
    #[error("Computation handle was already consumed and cannot be awaited again")]
    Reuse,

    // Persistence errors
    #[error("Failed to persist cache snapshot to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache snapshot not found: {0}")]
    SnapshotNotFound(PathBuf),

    #[error("Invalid cache snapshot {path}: {reason}")]
    SnapshotInvalid { path: PathBuf, reason: String },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a snapshot write error for `path`
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error for a value that did not come from a file
    pub fn config(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: PathBuf::from(source.into()),
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedArguments { .. } => {
                Some("Pass cache key material as positional arguments only")
            }
            Self::Reuse => Some("Wrap async functions with cache_async before caching them"),
            Self::Persist { .. } => Some("Check that the snapshot directory is writable"),
            Self::SnapshotNotFound(_) => {
                Some("Pass --snapshot or set cache.persistence_path in the config file")
            }
            Self::ConfigInvalid { .. } => Some("Run: regioncache config show"),
            _ => None,
        }
    }
}
