//! Shared fixtures for the client integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use eatsorder_domain::{ClientConfig, CredentialPair};
use eatsorder_infra::{ApiClient, CredentialStore, SessionObserver};
use serde::Deserialize;
use wiremock::MockServer;

pub const API_KEY: &str = "test-app-key";
pub const PROFILE_PATH: &str = "/users/me/profile";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Unsigned JWT for `subject` expiring `offset_secs` from now.
pub fn token(subject: &str, offset_secs: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "sub": subject,
        "exp": chrono::Utc::now().timestamp() + offset_secs,
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

/// Counts session-expired signals.
#[derive(Default)]
pub struct ExpiryCounter(AtomicUsize);

impl ExpiryCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl SessionObserver for ExpiryCounter {
    fn on_session_expired(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
    pub nick: String,
}

/// Client against `server` with its own in-memory store.
pub struct TestClient {
    pub client: Arc<ApiClient>,
    pub store: Arc<CredentialStore>,
    pub expired: Arc<ExpiryCounter>,
}

impl TestClient {
    pub fn new(server: &MockServer) -> Self {
        let mut config = ClientConfig::new(server.uri());
        config.api_key = Some(API_KEY.to_string());
        Self::with_config(config)
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let store = Arc::new(CredentialStore::in_memory());
        let expired = Arc::new(ExpiryCounter::default());
        let client = ApiClient::builder()
            .config(config)
            .credential_store(store.clone())
            .observer(expired.clone())
            .build()
            .expect("client should build");

        Self { client: Arc::new(client), store, expired }
    }

    /// Sign in with `access` / `refresh`.
    pub fn signed_in(self, access: &str, refresh: &str) -> Self {
        self.client.sign_in(CredentialPair::new(access, refresh));
        self
    }
}

/// Requests the server received on `path`.
pub async fn requests_to(server: &MockServer, path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == path)
        .collect()
}
