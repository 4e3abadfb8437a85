//! Durable storage for the bearer credential.
//!
//! Exactly one value is stored, under one fixed key. An absent value means
//! "logged out". Clearing an absent value succeeds without doing anything.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};

use crate::config::{Config, StorageKind};

/// Keychain service name
const SERVICE_NAME: &str = "talkvault";

/// Fixed key the credential is stored under
pub const TOKEN_KEY: &str = "access_token";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

pub trait TokenStore: Send + Sync {
    /// Stored credential, or `None` when logged out.
    fn load(&self) -> Result<Option<String>>;

    fn save(&self, token: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Open the backend selected in the config.
pub fn open(config: &Config) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match config.storage {
        StorageKind::File => Arc::new(FileTokenStore::new(config.cache_dir()?)),
        StorageKind::Keyring => Arc::new(KeyringTokenStore::new()),
        StorageKind::Memory => Arc::new(MemoryTokenStore::default()),
    };
    Ok(store)
}

// ============================================================================
// File
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    stored_at: DateTime<Utc>,
}

/// `session.json` in the cache directory.
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let stored: StoredToken =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        if stored.access_token.is_empty() {
            return Ok(None);
        }
        Ok(Some(stored.access_token))
    }

    fn save(&self, token: &str) -> Result<()> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }
        let stored = StoredToken {
            access_token: token.to_string(),
            stored_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        write_private(&path, &contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// Write a file readable by the owner only.
#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

// ============================================================================
// Keyring
// ============================================================================

/// OS keychain entry.
#[derive(Default)]
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self
    }

    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, TOKEN_KEY).context("Failed to create keyring entry")
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match Self::entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credential from keychain"),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        Self::entry()?
            .set_password(token)
            .context("Failed to store credential in keychain")
    }

    fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Process-local storage. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token.into()))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
