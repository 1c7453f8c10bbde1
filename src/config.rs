//! Clubsync Configuration
//!
//! This module provides configuration structures for the clubsync server
//! daemon and the sync client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main clubsync configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClubsyncConfig {
    /// HTTP API server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote store endpoint configuration (client side)
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Background synchronization configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Enable the HTTP API
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTP API bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Enable CORS
    #[serde(default)]
    pub cors_enabled: bool,
}

/// Remote store endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote store API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-attempt request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum attempts per request (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds; doubles on every retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

/// Background synchronization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minutes between periodic sync passes
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Shorter cadence used when the initial sync failed
    #[serde(default = "default_retry_interval_minutes")]
    pub retry_interval_minutes: u64,

    /// Delay before the first sync pass after loading data
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0:4000".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:4000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_interval_minutes() -> u64 {
    3
}

fn default_retry_interval_minutes() -> u64 {
    2
}

fn default_initial_delay_secs() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
            cors_enabled: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            retry_interval_minutes: default_retry_interval_minutes(),
            initial_delay_secs: default_initial_delay_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ClubsyncConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: ClubsyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.bind_address.is_empty() {
            return Err(crate::Error::Config(
                "server.bind_address cannot be empty".into(),
            ));
        }

        if !self.remote.base_url.starts_with("http://") && !self.remote.base_url.starts_with("https://") {
            return Err(crate::Error::Config(
                "remote.base_url must be an http(s) URL".into(),
            ));
        }

        if self.remote.max_attempts == 0 {
            return Err(crate::Error::Config(
                "remote.max_attempts must be at least 1".into(),
            ));
        }

        if self.sync.interval_minutes == 0 || self.sync.retry_interval_minutes == 0 {
            return Err(crate::Error::Config(
                "sync intervals must be at least one minute".into(),
            ));
        }

        Ok(())
    }

    /// Get the per-attempt request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    /// Get the base backoff delay as Duration
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.remote.backoff_base_ms)
    }

    /// Get the periodic sync interval as Duration
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_minutes * 60)
    }

    /// Get the faster retry interval as Duration
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.sync.retry_interval_minutes * 60)
    }

    /// Get the delay before the first sync pass as Duration
    pub fn initial_sync_delay(&self) -> Duration {
        Duration::from_secs(self.sync.initial_delay_secs)
    }
}
