//! Configuration schema for regioncache
//!
//! Configuration is stored at `~/.config/regioncache/config.toml`

use crate::cache::ttl::BackendConfig;
use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment prefix used by the binary
pub const ENV_PREFIX: &str = "REGIONCACHE";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache region settings
    pub cache: CacheSettings,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Settings for one cache region and its backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum resident entries
    pub capacity: usize,

    /// Seconds before an entry is stale
    pub ttl_secs: u64,

    /// Snapshot file; in-memory only when unset
    pub persistence_path: Option<PathBuf>,

    /// Namespace added to generated keys
    pub namespace: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl_secs: 300,
            persistence_path: None,
            namespace: None,
        }
    }
}

impl CacheSettings {
    /// `ttl_secs` as a duration, if it is representable
    pub fn ttl(&self) -> Option<chrono::Duration> {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    /// Backend configuration described by these settings
    pub fn backend_config(&self) -> CacheResult<BackendConfig> {
        let ttl = self
            .ttl()
            .ok_or_else(|| CacheError::config("cache.ttl_secs", "value too large"))?;
        let config = BackendConfig::new(self.capacity, ttl)?;

        Ok(match &self.persistence_path {
            Some(path) => config.with_persistence(path),
            None => config,
        })
    }
}

impl Config {
    /// Check values the schema cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.cache.capacity == 0 {
            return Err("cache.capacity must be positive".to_string());
        }
        if self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be positive".to_string());
        }
        if self.cache.ttl().is_none() {
            return Err(format!(
                "cache.ttl_secs is too large: {}",
                self.cache.ttl_secs
            ));
        }
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }
        Ok(())
    }

    /// Override settings from `{prefix}_*` environment variables
    ///
    /// Reads `_CAPACITY`, `_TTL`, `_PERSISTENCE_PATH` and `_NAMESPACE`.
    /// Environment values win over the file.
    pub fn apply_env(&mut self, prefix: &str) -> CacheResult<()> {
        self.apply_vars(prefix, |name| std::env::var(name).ok())
    }

    fn apply_vars<F>(&mut self, prefix: &str, lookup: F) -> CacheResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{}_{}", prefix, suffix);
            lookup(&name).map(|value| (name, value))
        };

        if let Some((name, value)) = var("CAPACITY") {
            self.cache.capacity = parse_number(&name, &value)?;
        }
        if let Some((name, value)) = var("TTL") {
            self.cache.ttl_secs = parse_number(&name, &value)?;
        }
        if let Some((_, value)) = var("PERSISTENCE_PATH") {
            self.cache.persistence_path = Some(PathBuf::from(value)).filter(|p| !p.as_os_str().is_empty());
        }
        if let Some((_, value)) = var("NAMESPACE") {
            self.cache.namespace = Some(value).filter(|ns| !ns.is_empty());
        }
        Ok(())
    }
}

fn parse_number<N: std::str::FromStr>(name: &str, value: &str) -> CacheResult<N> {
    value
        .trim()
        .parse()
        .map_err(|_| CacheError::config(name, format!("invalid number: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.cache.ttl_secs, 300);
        assert!(config.cache.persistence_path.is_none());
    }

    #[test]
    fn parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            capacity = 100
            ttl_secs = 5
            persistence_path = "/tmp/cache.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.cache.ttl_secs, 5);
        assert_eq!(
            config.cache.persistence_path,
            Some(PathBuf::from("/tmp/cache.json"))
        );
        assert_eq!(config.general.log_format, "text");
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert!(config.validate().unwrap_err().contains("capacity"));

        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        assert!(config.validate().unwrap_err().contains("ttl_secs"));
    }

    #[test]
    fn env_overrides_file_values() {
        let env = vars(&[
            ("TEST_CAPACITY", "42"),
            ("TEST_TTL", "7"),
            ("TEST_PERSISTENCE_PATH", "/var/cache/app.json"),
            ("TEST_NAMESPACE", "ns"),
        ]);
        let mut config = Config::default();
        config.apply_vars("TEST", |name| env.get(name).cloned()).unwrap();

        assert_eq!(config.cache.capacity, 42);
        assert_eq!(config.cache.ttl_secs, 7);
        assert_eq!(
            config.cache.persistence_path,
            Some(PathBuf::from("/var/cache/app.json"))
        );
        assert_eq!(config.cache.namespace.as_deref(), Some("ns"));
    }

    #[test]
    fn env_invalid_number_names_variable() {
        let env = vars(&[("TEST_CAPACITY", "lots")]);
        let mut config = Config::default();
        let err = config
            .apply_vars("TEST", |name| env.get(name).cloned())
            .unwrap_err();
        assert!(err.to_string().contains("TEST_CAPACITY"));
    }

    #[test]
    fn oversized_ttl_is_rejected_without_panicking() {
        let mut config = Config::default();
        config.cache.ttl_secs = 10_000_000_000_000_000;

        assert!(config.validate().unwrap_err().contains("too large"));
        assert!(matches!(
            config.cache.backend_config(),
            Err(CacheError::ConfigInvalid { .. })
        ));

        config.cache.ttl_secs = u64::MAX;
        assert!(config.cache.ttl().is_none());
    }

    #[test]
    fn backend_config_from_settings() {
        let settings = CacheSettings {
            capacity: 10,
            ttl_secs: 5,
            persistence_path: Some(PathBuf::from("/tmp/x.json")),
            namespace: None,
        };
        let config = settings.backend_config().unwrap();
        assert_eq!(config.capacity(), 10);
        assert_eq!(config.ttl(), chrono::Duration::seconds(5));
        assert_eq!(
            config.persistence_path(),
            Some(std::path::Path::new("/tmp/x.json"))
        );
    }
}
