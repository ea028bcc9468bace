//! Credential persistence backends
//!
//! A backend only persists; caching and expiry checks live in
//! [`CredentialStore`](super::credentials::CredentialStore).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use eatsorder_domain::CredentialPair;
use keyring::Entry;
use parking_lot::Mutex;
use tracing::debug;

use super::credentials::CredentialStoreError;

/// File name used by [`FileBackend::in_dir`]
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Durable storage for the credential pair
pub trait CredentialBackend: Send + Sync {
    /// Persisted pair, `None` when nothing is stored
    fn load(&self) -> Result<Option<CredentialPair>, CredentialStoreError>;

    /// Replace the persisted pair
    fn store(&self, pair: &CredentialPair) -> Result<(), CredentialStoreError>;

    /// Remove the persisted pair (idempotent)
    fn erase(&self) -> Result<(), CredentialStoreError>;
}

/// Platform keychain (macOS Keychain, Windows Credential Manager, Linux
/// Secret Service). The pair is stored as one JSON secret.
pub struct KeychainBackend {
    service: String,
    account: String,
}

impl KeychainBackend {
    /// # Arguments
    /// * `service` - Service identifier (e.g., "EatsOrder.auth")
    /// * `account` - Entry name inside the service (e.g., "session")
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self { service: service.into(), account: account.into() }
    }

    fn entry(&self) -> Result<Entry, CredentialStoreError> {
        Entry::new(&self.service, &self.account).map_err(|e| {
            CredentialStoreError::Keychain(format!(
                "Failed to open keychain entry {}/{}: {}",
                self.service, self.account, e
            ))
        })
    }
}

impl CredentialBackend for KeychainBackend {
    fn load(&self) -> Result<Option<CredentialPair>, CredentialStoreError> {
        debug!(service = %self.service, account = %self.account, "Loading credentials from keychain");

        match self.entry()?.get_password() {
            Ok(secret) => Ok(Some(serde_json::from_str(&secret)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialStoreError::Keychain(format!(
                "Failed to read credentials for {}: {}",
                self.account, e
            ))),
        }
    }

    fn store(&self, pair: &CredentialPair) -> Result<(), CredentialStoreError> {
        debug!(service = %self.service, account = %self.account, "Storing credentials in keychain");

        let secret = serde_json::to_string(pair)?;
        self.entry()?.set_password(&secret).map_err(|e| {
            CredentialStoreError::Keychain(format!(
                "Failed to store credentials for {}: {}",
                self.account, e
            ))
        })
    }

    fn erase(&self) -> Result<(), CredentialStoreError> {
        debug!(service = %self.service, account = %self.account, "Deleting credentials from keychain");

        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialStoreError::Keychain(format!(
                "Failed to delete credentials for {}: {}",
                self.account, e
            ))),
        }
    }
}

/// JSON file in an app-scoped directory
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash never leaves a half-written pair behind.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend writing [`CREDENTIALS_FILE_NAME`] inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CREDENTIALS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialBackend for FileBackend {
    fn load(&self) -> Result<Option<CredentialPair>, CredentialStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, pair: &CredentialPair) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            restrict_permissions(&file)?;
            file.write_all(&serde_json::to_vec(pair)?)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        debug!(path = %self.path.display(), "Credentials written");
        Ok(())
    }

    fn erase(&self) -> Result<(), CredentialStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

/// Process-local storage for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<CredentialPair>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that already holds `pair`
    pub fn with_credentials(pair: CredentialPair) -> Self {
        Self { slot: Mutex::new(Some(pair)) }
    }
}

impl CredentialBackend for MemoryBackend {
    fn load(&self) -> Result<Option<CredentialPair>, CredentialStoreError> {
        Ok(self.slot.lock().clone())
    }

    fn store(&self, pair: &CredentialPair) -> Result<(), CredentialStoreError> {
        *self.slot.lock() = Some(pair.clone());
        Ok(())
    }

    fn erase(&self) -> Result<(), CredentialStoreError> {
        *self.slot.lock() = None;
        Ok(())
    }
}
