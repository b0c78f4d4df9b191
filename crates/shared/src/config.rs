//! Configuration management for the anistream project.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    #[serde(default)]
    pub data: DataConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream API client settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Upstream API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL, up to and including `/api/anime`
    pub base_url: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Return the built-in sample list when the latest listing fails
    pub fallback_sample: bool,

    /// Throttle settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry settings for rate-limited requests
    #[serde(default)]
    pub retry: RetryConfig,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Prefetch settings
    #[serde(default)]
    pub prefetch: PrefetchConfig,

    /// Status enrichment settings
    #[serde(default)]
    pub enrich: EnrichConfig,
}

/// Throttle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum spacing between two outgoing requests
    pub min_interval_ms: u64,

    /// Cool-down applied when the latest listing is rejected without `Retry-After`
    pub latest_cooldown_ms: u64,

    /// Cool-down applied when any other listing is rejected without `Retry-After`
    pub listing_cooldown_ms: u64,
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Base backoff delay, doubled after every rejected attempt
    pub base_delay_ms: u64,
}

/// Persistent store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One JSON file per entry
    File,
    /// Single SQLite table
    Sqlite,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the persistent tier (memory tiers are always on)
    pub enabled: bool,

    /// Persistent store backend
    pub backend: CacheBackend,

    /// Cache directory for the file backend (relative to data directory)
    pub cache_dir: String,

    /// Database path for the SQLite backend (relative to data directory)
    pub db_path: String,

    /// Prefix prepended to every persisted key
    pub key_prefix: String,

    /// Expiry of detail entries in seconds
    pub detail_ttl_seconds: u64,

    /// Expiry of video entries in seconds
    pub video_ttl_seconds: u64,

    /// Expiry of listing pages (search, recommended, latest, movies) in seconds
    pub listing_ttl_seconds: u64,

    /// Expiry of the home snapshot in seconds
    pub home_ttl_seconds: u64,
}

/// Prefetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// Enable speculative prefetching
    pub enabled: bool,

    /// Delay before warming an adjacent page
    pub page_delay_ms: u64,

    /// Delay before warming the alternate video resolution
    pub video_delay_ms: u64,
}

/// Status enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Number of leading items considered
    pub limit: usize,

    /// Pause before each detail lookup
    pub delay_ms: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root_dir: "data".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: true,
            json_format: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sansekai.my.id/api/anime".to_string(),
            timeout_ms: 5_000,
            fallback_sample: true,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            prefetch: PrefetchConfig::default(),
            enrich: EnrichConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 3_500,
            latest_cooldown_ms: 90_000,
            listing_cooldown_ms: 60_000,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 3_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::File,
            cache_dir: "cache".to_string(),
            db_path: "cache.db".to_string(),
            key_prefix: "anistream_".to_string(),
            detail_ttl_seconds: 3_600,
            video_ttl_seconds: 3_600,
            listing_ttl_seconds: 300,
            home_ttl_seconds: 300,
        }
    }
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_delay_ms: 500,
            video_delay_ms: 1_000,
        }
    }
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            delay_ms: 2_000,
        }
    }
}

impl RateLimitConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn latest_cooldown(&self) -> Duration {
        Duration::from_millis(self.latest_cooldown_ms)
    }

    pub fn listing_cooldown(&self) -> Duration {
        Duration::from_millis(self.listing_cooldown_ms)
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl CacheConfig {
    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_seconds)
    }

    pub fn video_ttl(&self) -> Duration {
        Duration::from_secs(self.video_ttl_seconds)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_seconds)
    }

    pub fn home_ttl(&self) -> Duration {
        Duration::from_secs(self.home_ttl_seconds)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.log_dir)
    }

    /// Get the absolute path for the file cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(&self.api.cache.cache_dir)
    }

    /// Get the absolute path for the SQLite cache database
    pub fn cache_db_path(&self) -> PathBuf {
        self.resolve(&self.api.cache.db_path)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}
