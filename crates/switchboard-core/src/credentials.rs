//! Network credential persistence.
//!
//! Credentials are stored as three string keys (`ssid`, `pass`, `name`) and
//! always written together. Backends:
//! - ESP32: NVS namespace (see `switchboard-esp32`)
//! - Linux: a JSON file ([`FileCredentialStore`])
//! - Tests: [`MemoryCredentialStore`]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading or writing credentials.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to read stored credentials.
    #[error("Read error: {0}")]
    Read(String),

    /// Failed to write credentials.
    #[error("Write error: {0}")]
    Write(String),

    /// Stored data could not be decoded.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The storage backend is not available.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Last saved network join credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkCredentials {
    /// Network name; empty when never provisioned.
    pub ssid: String,

    /// Network password.
    #[serde(rename = "pass")]
    pub password: String,

    /// Hostname to advertise; empty means "use the fallback".
    #[serde(rename = "name")]
    pub device_name: String,
}

impl NetworkCredentials {
    pub fn new(ssid: &str, password: &str, device_name: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            password: password.to_string(),
            device_name: device_name.to_string(),
        }
    }

    /// Whether there is a network to join.
    pub fn has_network(&self) -> bool {
        !self.ssid.is_empty()
    }
}

/// Key-value store that survives power loss.
///
/// All methods are synchronous to support embedded platforms.
pub trait CredentialStore: Send {
    /// Load stored credentials. Absent keys read as empty strings.
    fn load(&self) -> Result<NetworkCredentials, StorageError>;

    /// Overwrite all three keys.
    fn save(&mut self, credentials: &NetworkCredentials) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    credentials: NetworkCredentials,
    writes: usize,
    fail_writes: bool,
}

/// In-memory store that counts writes.
///
/// Clones share the same contents, so a test can keep a handle while the
/// controller owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with credentials already stored (not counted as a write).
    pub fn with_credentials(credentials: NetworkCredentials) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                credentials,
                ..MemoryInner::default()
            })),
        }
    }

    /// Make every later save fail, as a worn or full flash would.
    pub fn fail_writes(&self) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).fail_writes = true;
    }

    /// Number of successful saves.
    pub fn writes(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).writes
    }

    /// Currently stored credentials.
    pub fn stored(&self) -> NetworkCredentials {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .credentials
            .clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<NetworkCredentials, StorageError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| StorageError::Unavailable("store is locked".to_string()))?;
        Ok(inner.credentials.clone())
    }

    fn save(&mut self, credentials: &NetworkCredentials) -> Result<(), StorageError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StorageError::Unavailable("store is locked".to_string()))?;
        if inner.fail_writes {
            return Err(StorageError::Write("simulated write failure".to_string()));
        }
        inner.credentials = credentials.clone();
        inner.writes += 1;
        Ok(())
    }
}

/// JSON file store for host builds.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<NetworkCredentials, StorageError> {
        if !self.path.exists() {
            return Ok(NetworkCredentials::default());
        }
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| StorageError::Read(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&json).map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    fn save(&mut self, credentials: &NetworkCredentials) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(credentials)
            .map_err(|e| StorageError::Write(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| StorageError::Write(format!("{}: {e}", self.path.display())))
    }
}
