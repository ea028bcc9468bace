//! Configuration management

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ACCESS_EXPIRED_STATUS, DEFAULT_API_KEY_HEADER, DEFAULT_EXPIRY_LEEWAY_SECS,
    DEFAULT_REFRESH_PATH, DEFAULT_SESSION_INVALID_STATUS, DEFAULT_TIMEOUT_SECS,
};
use crate::errors::{ClientError, ClientResult};
use crate::headers::{header_map, parse_header_name, parse_header_value, HeaderMap};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Absolute base URL of the backend (e.g. "https://api.eatsorder.app/v1")
    pub base_url: String,
    /// Application key sent on every request
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra headers merged under every endpoint's own headers
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Authentication contract with the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Status meaning "access credential expired, refresh and retry"
    #[serde(default = "default_access_expired_status")]
    pub access_expired_status: u16,
    /// Status meaning "session unrecoverable, do not retry"
    #[serde(default = "default_session_invalid_status")]
    pub session_invalid_status: u16,
    /// Path of the credential-refresh endpoint, relative to `base_url`
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Optional scheme prefixed to the access credential (e.g. "Bearer").
    /// `None` sends the bare token.
    #[serde(default)]
    pub authorization_scheme: Option<String>,
    /// Access credentials expiring within this many seconds count as expired
    #[serde(default = "default_expiry_leeway_secs")]
    pub expiry_leeway_secs: u64,
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_access_expired_status() -> u16 {
    DEFAULT_ACCESS_EXPIRED_STATUS
}

fn default_session_invalid_status() -> u16 {
    DEFAULT_SESSION_INVALID_STATUS
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_expiry_leeway_secs() -> u64 {
    DEFAULT_EXPIRY_LEEWAY_SECS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_expired_status: DEFAULT_ACCESS_EXPIRED_STATUS,
            session_invalid_status: DEFAULT_SESSION_INVALID_STATUS,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            authorization_scheme: None,
            expiry_leeway_secs: DEFAULT_EXPIRY_LEEWAY_SECS,
        }
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_headers: BTreeMap::new(),
            auth: AuthConfig::default(),
        }
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check invariants the client relies on
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if the base URL is not absolute, the
    /// timeout is zero, a configured header is malformed, or the two
    /// authentication status codes are not distinct 4xx/5xx codes
    pub fn validate(&self) -> Result<(), ClientError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must be an absolute http(s) URL, got '{}'",
                self.base_url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be greater than zero".into()));
        }

        self.request_headers().map_err(|e| ClientError::Config(e.to_string()))?;

        self.auth.validate()
    }

    /// Headers sent with every request: `default_headers` plus the API key
    ///
    /// The API key value is marked sensitive.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidHeader` if a configured name or value is
    /// malformed
    pub fn request_headers(&self) -> ClientResult<HeaderMap> {
        let mut headers = header_map(&self.default_headers)?;
        if let Some(api_key) = &self.api_key {
            let mut value = parse_header_value(&self.api_key_header, api_key)?;
            value.set_sensitive(true);
            headers.insert(parse_header_name(&self.api_key_header)?, value);
        }
        Ok(headers)
    }
}

impl AuthConfig {
    /// Expiry leeway as a duration
    pub fn expiry_leeway(&self) -> Duration {
        Duration::from_secs(self.expiry_leeway_secs)
    }

    /// # Errors
    ///
    /// Returns `ClientError::Config` when the status codes collide or fall
    /// outside 400–599, or the refresh path is empty
    pub fn validate(&self) -> Result<(), ClientError> {
        for (name, status) in [
            ("access_expired_status", self.access_expired_status),
            ("session_invalid_status", self.session_invalid_status),
        ] {
            if !(400..=599).contains(&status) {
                return Err(ClientError::Config(format!(
                    "{name} must be a 4xx or 5xx status, got {status}"
                )));
            }
        }

        if self.access_expired_status == self.session_invalid_status {
            return Err(ClientError::Config(format!(
                "access_expired_status and session_invalid_status must differ (both {})",
                self.access_expired_status
            )));
        }

        if self.refresh_path.trim().is_empty() {
            return Err(ClientError::Config("refresh_path must not be empty".into()));
        }

        Ok(())
    }
}
