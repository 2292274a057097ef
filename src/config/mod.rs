//! Configuration management for the gateway
//!
//! Supports configuration via:
//! 1. Settings file (~/.config/carelink-gateway/config.toml)
//! 2. Environment variables (CARELINK_TIMEOUT_SECS, CARELINK_USAGE_LOG, ...)
//! 3. Provider profiles persisted in the secret store (see [`loader`])

pub mod loader;
mod profile;

pub use loader::{
    load_profiles, save_profiles, FileSecretStore, MemorySecretStore, SecretStore, PROFILES_KEY,
};
pub use profile::{ProfileStore, ProviderProfile, DEFAULT_PRIORITY};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Secret store error: {0}")]
    SecretStore(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Upper bound for one adapter attempt
    pub request_timeout_secs: u64,

    /// Pending usage records before new ones are dropped
    pub usage_queue_capacity: usize,

    /// Append-only usage log (JSON lines)
    pub usage_log_path: PathBuf,

    /// File backing the secret store that holds provider profiles
    pub secret_store_path: PathBuf,

    /// Default reporting window for usage stats
    pub stats_days: u32,

    /// Default number of records shown by usage history
    pub history_limit: usize,

    /// Usage records older than this are removed by cleanup
    pub retention_days: u32,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("carelink-gateway")
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            usage_queue_capacity: 256,
            usage_log_path: data_dir().join("usage.jsonl"),
            secret_store_path: data_dir().join("secrets.json"),
            stats_days: 30,
            history_limit: 100,
            retention_days: 90,
        }
    }
}

impl GatewaySettings {
    /// Get default settings file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("carelink-gateway")
            .join("config.toml")
    }

    /// Load settings from default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load settings from specific path, falling back to defaults when absent
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default().with_env_overrides());
        }

        let content = std::fs::read_to_string(&path)?;
        let settings: GatewaySettings = toml::from_str(&content)?;

        Ok(settings.with_env_overrides())
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(secs) = std::env::var("CARELINK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.request_timeout_secs = secs;
        }
        if let Ok(path) = std::env::var("CARELINK_USAGE_LOG") {
            self.usage_log_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("CARELINK_SECRET_STORE") {
            self.secret_store_path = PathBuf::from(path);
        }

        self
    }

    /// Save settings to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path())
    }

    /// Save settings to specific path
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.usage_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "usage_queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Generate example settings content
    pub fn example() -> String {
        toml::to_string_pretty(&GatewaySettings::default()).unwrap_or_default()
    }
}
