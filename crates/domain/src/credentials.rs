//! Credential pair issued by the backend on sign-in and refresh

use std::fmt;

use serde::{Deserialize, Serialize};

/// Access and refresh credentials
///
/// Deserializes directly from the backend's login and refresh responses
/// (`accessToken` / `refreshToken`); extra fields such as `userId` are ignored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    /// Short-lived credential attached to authenticated requests
    pub access_token: String,
    /// Long-lived credential exchanged for a new pair
    pub refresh_token: String,
}

impl CredentialPair {
    /// Pair from an access and a refresh credential
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }

    /// Both tokens are present
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}
