//! Credential store
//!
//! In-memory cache over a [`CredentialBackend`]. Constructed once and shared
//! by `Arc`; the session dispatcher is the only writer during normal
//! operation.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use eatsorder_domain::constants::DEFAULT_EXPIRY_LEEWAY_SECS;
use eatsorder_domain::CredentialPair;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use super::jwt;
use super::storage::{CredentialBackend, MemoryBackend};

/// Errors raised while persisting credentials
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for credential persistence
pub type CredentialStoreResult<T> = Result<T, CredentialStoreError>;

/// Cached credential pair with durable backing
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
    cache: RwLock<Option<CredentialPair>>,
    leeway: Duration,
}

impl CredentialStore {
    /// Load persisted credentials from `backend`
    ///
    /// Access credentials expiring within `leeway` count as expired.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if persisted credentials exist but cannot
    /// be read
    pub fn open(
        backend: Arc<dyn CredentialBackend>,
        leeway: Duration,
    ) -> CredentialStoreResult<Self> {
        let cached = backend.load()?;
        debug!(logged_in = cached.as_ref().is_some_and(CredentialPair::is_complete), "Credential store opened");
        Ok(Self { backend, cache: RwLock::new(cached), leeway })
    }

    /// Empty store backed by process memory
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::new()),
            cache: RwLock::new(None),
            leeway: Duration::from_secs(DEFAULT_EXPIRY_LEEWAY_SECS),
        }
    }

    /// Make a new pair current and persist it
    ///
    /// # Errors
    ///
    /// Returns the backend's error. The pair stays current for this process
    /// even when persisting fails.
    pub fn save(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> CredentialStoreResult<()> {
        self.save_pair(&CredentialPair::new(access_token, refresh_token))
    }

    /// [`save`](Self::save) for an existing pair
    ///
    /// # Errors
    ///
    /// Returns the backend's error
    pub fn save_pair(&self, pair: &CredentialPair) -> CredentialStoreResult<()> {
        *self.cache.write() = Some(pair.clone());
        match self.backend.store(pair) {
            Ok(()) => {
                debug!("Credentials saved");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist credentials");
                Err(e)
            }
        }
    }

    /// Forget both credentials
    ///
    /// The cached pair is dropped even if erasing the backend fails.
    ///
    /// # Errors
    ///
    /// Returns the backend's error
    pub fn clear(&self) -> CredentialStoreResult<()> {
        *self.cache.write() = None;
        let result = self.backend.erase();
        match &result {
            Ok(()) => debug!("Credentials cleared"),
            Err(e) => warn!(error = %e, "Failed to erase persisted credentials"),
        }
        result
    }

    /// Both credentials are present
    pub fn is_logged_in(&self) -> bool {
        self.cache.read().as_ref().is_some_and(CredentialPair::is_complete)
    }

    /// `true` unless a readable, unexpired access credential is present
    pub fn is_access_expired(&self) -> bool {
        match self.access_token() {
            Some(token) => jwt::is_expired(&token, self.leeway),
            None => true,
        }
    }

    /// Access credential, `None` when absent or empty
    pub fn access_token(&self) -> Option<String> {
        self.cache
            .read()
            .as_ref()
            .map(|pair| pair.access_token.clone())
            .filter(|token| !token.is_empty())
    }

    /// Refresh credential, `None` when absent or empty
    pub fn refresh_token(&self) -> Option<String> {
        self.cache
            .read()
            .as_ref()
            .map(|pair| pair.refresh_token.clone())
            .filter(|token| !token.is_empty())
    }

    /// Snapshot of the current pair
    pub fn credentials(&self) -> Option<CredentialPair> {
        self.cache.read().clone()
    }

    /// Margin subtracted from the access credential's expiry
    pub fn leeway(&self) -> Duration {
        self.leeway
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("logged_in", &self.is_logged_in())
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}
