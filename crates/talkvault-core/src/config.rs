//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the API base address, request timeout, where the session
//! credential is persisted, and the last email used to log in.
//!
//! Configuration is stored at `~/.config/talkvault/config.json`. A handful of
//! environment variables override the file so a deployment can point the
//! client at another server without editing it.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "talkvault";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default API address (the FastAPI backend's development port)
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// HTTP request timeout in seconds.
/// Transcription and summarization run inside the request, so this is
/// measured in minutes rather than seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Environment override for the API base address
pub const ENV_API_URL: &str = "TALKVAULT_API_URL";
/// Environment override for the request timeout (seconds)
pub const ENV_TIMEOUT_SECS: &str = "TALKVAULT_TIMEOUT_SECS";
/// Environment override for the credential storage backend
pub const ENV_STORAGE: &str = "TALKVAULT_STORAGE";

/// Where the bearer credential is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// `session.json` in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "keyring" => Ok(StorageKind::Keyring),
            "memory" => Ok(StorageKind::Memory),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub storage: StorageKind,
    pub last_email: Option<String>,
    /// Directory for rolling log files; stderr only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            storage: StorageKind::default(),
            last_email: None,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a key lookup (the process environment in practice).
    /// Malformed values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_TIMEOUT_SECS),
            }
        }
        if let Some(raw) = lookup(ENV_STORAGE) {
            match raw.parse() {
                Ok(kind) => self.storage = kind,
                Err(e) => warn!(error = %e, "Ignoring invalid {}", ENV_STORAGE),
            }
        }
    }

    /// Base address without a trailing slash, ready for path joining.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
