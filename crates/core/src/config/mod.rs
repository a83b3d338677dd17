//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TABSCAN_*)
//! 2. TOML config file (if TABSCAN_CONFIG_FILE set)
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

/// Application configuration with layered loading.
///
/// Resolved once at startup and handed to each component's constructor.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TABSCAN_*)
/// 2. TOML config file (if TABSCAN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database being searched.
    ///
    /// Set via TABSCAN_SOURCE_PATH environment variable.
    #[serde(default = "default_source_path")]
    pub source_path: PathBuf,

    /// Environment id used when deriving cache keys.
    ///
    /// Set via TABSCAN_ENVIRONMENT environment variable.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Database id used when a caller does not name one.
    ///
    /// For the SQLite source this is the schema name (`main`, or an attached alias).
    #[serde(default = "default_database")]
    pub database: String,

    /// Root directory of the page store.
    ///
    /// Set via TABSCAN_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Rows per cached page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Hours after which cached metadata is stale.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Artifact size above which a write logs a warning. The write still happens.
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,

    /// Whether page and metadata artifacts are gzip-compressed.
    #[serde(default = "default_true")]
    pub compression: bool,

    /// Maximum number of source operations in flight at once.
    #[serde(default = "default_throttle_capacity")]
    pub throttle_capacity: usize,

    /// Minimum interval between two source dispatches in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Number of pages between two resource reclaim hints during a scan.
    #[serde(default = "default_reclaim_every_pages")]
    pub reclaim_every_pages: u64,

    /// Source command timeout in milliseconds (SQLite busy timeout).
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Matched values longer than this many characters are truncated for display.
    #[serde(default = "default_max_display_chars")]
    pub max_display_chars: usize,
}

fn default_source_path() -> PathBuf {
    PathBuf::from("./source.sqlite")
}

fn default_environment() -> String {
    "default".into()
}

fn default_database() -> String {
    "main".into()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./tabscan-cache")
}

fn default_page_size() -> u64 {
    10_000
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_max_artifact_bytes() -> u64 {
    52_428_800 // 50MB
}

fn default_true() -> bool {
    true
}

fn default_throttle_capacity() -> usize {
    2
}

fn default_pacing_ms() -> u64 {
    100
}

fn default_reclaim_every_pages() -> u64 {
    50
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

fn default_max_display_chars() -> usize {
    200
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_path: default_source_path(),
            environment: default_environment(),
            database: default_database(),
            cache_dir: default_cache_dir(),
            page_size: default_page_size(),
            ttl_hours: default_ttl_hours(),
            max_artifact_bytes: default_max_artifact_bytes(),
            compression: true,
            throttle_capacity: default_throttle_capacity(),
            pacing_ms: default_pacing_ms(),
            reclaim_every_pages: default_reclaim_every_pages(),
            command_timeout_ms: default_command_timeout_ms(),
            max_display_chars: default_max_display_chars(),
        }
    }
}

impl AppConfig {
    /// Pacing interval as Duration.
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Command timeout as Duration for the source connection.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Metadata TTL as a chrono duration, capped at the validated maximum.
    pub fn ttl(&self) -> chrono::Duration {
        let hours = i64::try_from(self.ttl_hours.min(validation::MAX_TTL_HOURS)).unwrap_or(i64::MAX);
        chrono::Duration::try_hours(hours).unwrap_or(chrono::Duration::MAX)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TABSCAN_`
    /// 2. TOML file from `TABSCAN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TABSCAN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("TABSCAN_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
