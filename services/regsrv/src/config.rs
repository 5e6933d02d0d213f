//! Service configuration
//!
//! Loaded through `common::config_loader`: built-in defaults, then
//! `config/regsrv.yaml` (or `--config FILE`), then `REGSRV_*` environment
//! variables such as `REGSRV_CACHE__TTL_SECS=60`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::logging::LogConfig;

pub const SERVICE_NAME: &str = "regsrv";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegsrvConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

/// Endpoint register cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Entry lifetime; bounds how long a missed invalidation can serve stale data
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write a daily rolling file under `dir`
    #[serde(default)]
    pub file: bool,
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default)]
    pub json: bool,
}

fn default_db_path() -> String {
    "data/regsrv.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
            dir: default_log_dir(),
            json: false,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl RegsrvConfig {
    /// Load and validate
    pub fn load(config_file: Option<&Path>) -> common::Result<Self> {
        let config: Self = common::config_loader::load_config(SERVICE_NAME, config_file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> common::Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(common::Error::Config(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(common::Error::Config(
                "cache.ttl_secs must be greater than 0 when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            service_name: SERVICE_NAME.to_string(),
            level: self.logging.level.clone(),
            log_dir: self
                .logging
                .file
                .then(|| PathBuf::from(&self.logging.dir)),
            enable_json: self.logging.json,
            ..LogConfig::default()
        }
    }
}
