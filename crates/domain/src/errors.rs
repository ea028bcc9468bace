//! Error types used throughout the client core
//!
//! `ClientError` is the only error a caller of the executor ever sees.
//! `AuthRetryNeeded` is part of the taxonomy but is an executor-internal
//! signal: it is consumed by the retry loop and never returned.

use std::time::Duration;

use thiserror::Error;

/// Categories of client errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorCategory {
    /// The request could not be constructed (bad URL, bad header, unserializable body)
    Request,
    /// The transport failed before an HTTP response was obtained
    Transport,
    /// The response body did not match the expected type
    Decode,
    /// The server answered with a non-success status nobody handled
    Server,
    /// The session is no longer usable; the user must sign in again
    Authentication,
    /// The retry budget of a logical request was spent
    Retry,
    /// The client itself is misconfigured
    Config,
}

/// Errors produced by the authenticated HTTP client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header {0}")]
    InvalidHeader(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to decode response: {0}")]
    Decoding(String),

    #[error("Failed to encode request body: {0}")]
    Encoding(String),

    #[error("Server returned status {status}{}", format_message(.message))]
    Server { status: u16, message: Option<String> },

    #[error("Authentication failed{}", format_message(.0))]
    AuthenticationFailed(Option<String>),

    #[error("Authentication retry needed")]
    AuthRetryNeeded,

    #[error("Maximum number of retries exceeded")]
    MaxRetriesExceeded,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn format_message(message: &Option<String>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!(": {message}"),
        _ => String::new(),
    }
}

impl ClientError {
    /// Get the error category for this error
    pub fn category(&self) -> ClientErrorCategory {
        match self {
            Self::InvalidUrl(_) | Self::InvalidHeader(_) | Self::Encoding(_) => {
                ClientErrorCategory::Request
            }
            Self::InvalidResponse(_) | Self::Transport(_) | Self::Timeout(_) => {
                ClientErrorCategory::Transport
            }
            Self::Decoding(_) => ClientErrorCategory::Decode,
            Self::Server { .. } => ClientErrorCategory::Server,
            Self::AuthenticationFailed(_) => ClientErrorCategory::Authentication,
            Self::AuthRetryNeeded | Self::MaxRetriesExceeded => ClientErrorCategory::Retry,
            Self::Config(_) => ClientErrorCategory::Config,
        }
    }

    /// `true` when the session is gone and the user has to sign in again
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;
