//! Configuration loading for regioncache
//!
//! Sources, lowest precedence first:
//!
//! | Source | Example |
//! |--------|---------|
//! | Built-in defaults | `capacity = 1000`, `ttl_secs = 300` |
//! | TOML file | `~/.config/regioncache/config.toml` |
//! | Environment | `REGIONCACHE_TTL=60` |

pub mod schema;

pub use schema::{CacheSettings, Config, ENV_PREFIX};

use crate::error::{CacheError, CacheResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const APP_DIR: &str = "regioncache";

/// Locates, reads and writes the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the per-user config file
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `{config_dir}/regioncache/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Directory for persisted cache state
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Snapshot used by the CLI when neither flag nor config names one
    pub fn default_snapshot_path() -> PathBuf {
        Self::state_dir().join("cache.json")
    }

    /// Read the file, falling back to defaults when it does not exist
    pub async fn load(&self) -> CacheResult<Config> {
        match self.load_from_file(&self.config_path).await {
            Err(CacheError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!(
                    "No config at {}, using defaults",
                    self.config_path.display()
                );
                Ok(Config::default())
            }
            other => other,
        }
    }

    /// [`load`](Self::load), then apply `REGIONCACHE_*` overrides and validate
    pub async fn load_with_env(&self) -> CacheResult<Config> {
        let mut config = self.load().await?;
        config.apply_env(ENV_PREFIX)?;
        config.validate().map_err(|reason| CacheError::ConfigInvalid {
            path: self.config_path.clone(),
            reason,
        })?;
        Ok(config)
    }

    /// Parse and validate one TOML file
    pub async fn load_from_file(&self, path: &Path) -> CacheResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CacheError::io(format!("reading config from {}", path.display()), e))?;

        let invalid = |reason: String| CacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };
        let config: Config = toml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(invalid)?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write `config` as TOML, creating the directory if needed
    pub async fn save(&self, config: &Config) -> CacheResult<()> {
        if let Some(dir) = self.config_path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::ConfigDirCreate {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
        }

        let rendered = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, rendered).await.map_err(|e| {
            CacheError::io(format!("writing config to {}", self.config_path.display()), e)
        })?;

        info!("Wrote config to {}", self.config_path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
