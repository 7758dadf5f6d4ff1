//! Configuration management.
//!
//! Configuration is read from `~/.config/estuary/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created. Missing fields fall back to defaults.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;

use crate::app::{EstuaryError, Result};
use crate::paging::DataPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ttl: TtlConfig,
    pub feeds: FeedConfig,
    pub sync: SyncConfig,
}

/// Per-stream-category freshness windows, in seconds.
///
/// Trend tabs churn quickly; reply histories rarely change after the fact.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub trend: u64,
    pub topics: u64,
    pub comments: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Reject feed entries with unparseable publish dates instead of
    /// stamping them with the current time.
    pub strict_dates: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub workers: usize,
    /// One of `cache_first`, `api_first`, `network_only`,
    /// `cache_else_network`.
    pub policy: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl: TtlConfig::default(),
            feeds: FeedConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            trend: 3600,
            topics: 600,
            comments: 86400,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            strict_dates: false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            policy: "cache_else_network".into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path()?;

        if !path.exists() {
            Self::create_default_config(&path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| EstuaryError::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    pub fn data_policy(&self) -> Result<DataPolicy> {
        match self.sync.policy.as_str() {
            "cache_first" => Ok(DataPolicy::CacheFirst),
            "api_first" => Ok(DataPolicy::ApiFirst),
            "network_only" => Ok(DataPolicy::NetworkOnly),
            "cache_else_network" => Ok(DataPolicy::CacheElseNetwork),
            other => Err(EstuaryError::Config(format!(
                "unknown sync.policy {other:?}"
            ))),
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| EstuaryError::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("estuary").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;
        Ok(())
    }
}

const DEFAULT_CONFIG: &str = r#"# estuary configuration

[ttl]
# Freshness windows in seconds, per stream category.
trend = 3600
topics = 600
comments = 86400

[feeds]
# Reject feed entries whose publish date cannot be parsed, instead of
# stamping them with the fetch time.
strict_dates = false

[sync]
# Concurrent stream syncs.
workers = 4
# cache_first | api_first | network_only | cache_else_network
policy = "cache_else_network"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ttl.trend, 3600);
        assert_eq!(config.sync.workers, 4);
        assert!(!config.feeds.strict_dates);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[ttl]\ntrend = 60\n").unwrap();
        assert_eq!(config.ttl.trend, 60);
        assert_eq!(config.ttl.topics, 600);
        assert_eq!(config.sync.policy, "cache_else_network");
    }

    #[test]
    fn test_data_policy_parsing() {
        let mut config = Config::default();
        for (s, expected) in [
            ("cache_first", DataPolicy::CacheFirst),
            ("api_first", DataPolicy::ApiFirst),
            ("network_only", DataPolicy::NetworkOnly),
            ("cache_else_network", DataPolicy::CacheElseNetwork),
        ] {
            config.sync.policy = s.into();
            assert_eq!(config.data_policy().unwrap(), expected);
        }

        config.sync.policy = "psychic".into();
        assert!(config.data_policy().is_err());
    }

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.ttl.comments, 86400);
    }
}
