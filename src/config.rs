//! Global server configuration.
//!
//! Loads relay-wide settings from `~/.grabwire/config.toml`. Everything is
//! fixed at process start; there is no runtime mutation surface.
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! ports = [9219, 9220, 9221]
//!
//! [store]
//! capacity = 50
//! ttl_ms = 3_600_000
//! sweep_interval_ms = 300_000
//!
//! [limits]
//! max_body_len = 50_000
//! max_excerpt_len = 10_000
//! max_media_len = 1_000_000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CAPACITY, DEFAULT_HOST, DEFAULT_PORTS,
    DEFAULT_SWEEP_INTERVAL_MS, DEFAULT_TTL_MS, MAX_BODY_LEN, MAX_EXCERPT_LEN, MAX_MEDIA_LEN,
};

/// Global relay configuration loaded from `~/.grabwire/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener settings.
    pub server: ServerSettings,
    /// Store capacity and expiry settings.
    pub store: StoreSettings,
    /// Payload size ceilings.
    pub limits: LimitSettings,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind host for the producer/consumer listener.
    pub host: String,
    /// Candidate ports, tried in order until one binds.
    pub ports: Vec<u16>,
}

/// Store capacity and expiry settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Maximum number of live records; admission beyond this evicts the
    /// oldest-admitted survivor.
    pub capacity: usize,
    /// Record time-to-live in milliseconds.
    pub ttl_ms: i64,
    /// Background sweep interval in milliseconds.
    pub sweep_interval_ms: u64,
}

/// Payload size ceilings, in characters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Body ceiling; longer bodies are cut and marked.
    pub max_body_len: usize,
    /// Excerpt ceiling; longer excerpts are cut and marked.
    pub max_excerpt_len: usize,
    /// Media ceiling; larger media is dropped entirely and flagged.
    pub max_media_len: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            ports: DEFAULT_PORTS.to_vec(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl_ms: DEFAULT_TTL_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_body_len: MAX_BODY_LEN,
            max_excerpt_len: MAX_EXCERPT_LEN,
            max_media_len: MAX_MEDIA_LEN,
        }
    }
}

impl Config {
    /// Load configuration from the given path.
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid, returns an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            ports = ?config.server.ports,
            capacity = config.store.capacity,
            ttl_ms = config.store.ttl_ms,
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Get the default path to the configuration file.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Reject configurations that cannot produce a working relay.
    pub fn validate(&self) -> Result<()> {
        if self.store.capacity == 0 {
            anyhow::bail!("store.capacity must be at least 1");
        }
        if self.store.ttl_ms <= 0 {
            anyhow::bail!("store.ttl_ms must be positive");
        }
        if self.server.ports.is_empty() {
            anyhow::bail!("server.ports must list at least one port");
        }
        Ok(())
    }
}
