//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SITEFEED_*)
//! 2. TOML config file (if SITEFEED_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which object store backs the cache, the read-later list and the SDD registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Plain files under `data_dir`.
    #[default]
    Filesystem,
    /// A single SQLite database at `db_path`.
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Filesystem => "filesystem",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SITEFEED_*)
/// 2. TOML config file (if SITEFEED_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to.
    ///
    /// Set via SITEFEED_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Shared secret gating the write and list endpoints.
    ///
    /// Set via SITEFEED_ADD_KEY. When absent every gated endpoint rejects.
    #[serde(default)]
    pub add_key: Option<String>,

    /// Feed cache lifetime in minutes; 0 disables caching.
    ///
    /// Set via SITEFEED_CACHE_MINUTES environment variable.
    #[serde(default)]
    pub cache_minutes: u64,

    /// Storage backend, selected once at process start.
    ///
    /// Set via SITEFEED_STORAGE (`filesystem` or `sqlite`).
    #[serde(default)]
    pub storage: StorageBackend,

    /// Root directory for the filesystem backend.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file for the SQLite backend.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Default User-Agent for page acquisition; an SDD may override it.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Default acquisition timeout in milliseconds; an SDD may override it.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per page.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Whether headless rendering is available to SDDs that ask for it.
    #[serde(default)]
    pub render_enabled: bool,

    /// Number of read-later items kept after eviction.
    #[serde(default = "default_read_later_limit")]
    pub read_later_limit: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".into()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sitefeed.sqlite")
}

pub fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_read_later_limit() -> usize {
    crate::read_later::READ_LATER_LIMIT
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            add_key: None,
            cache_minutes: 0,
            storage: StorageBackend::default(),
            data_dir: default_data_dir(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            render_enabled: false,
            read_later_limit: default_read_later_limit(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Feed cache TTL. Zero means caching is disabled.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_minutes.saturating_mul(60))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SITEFEED_`
    /// 2. TOML file from `SITEFEED_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SITEFEED_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SITEFEED_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Shared secret for gated endpoints, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no key is set.
    pub fn require_add_key(&self) -> Result<&str, ConfigError> {
        self.add_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "add_key".into(),
                hint: "Set SITEFEED_ADD_KEY environment variable".into(),
            })
    }
}
