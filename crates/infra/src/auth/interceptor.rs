//! Authentication interceptor
//!
//! Attaches the access credential and turns the backend's two
//! authentication statuses into a refresh-and-retry or a session loss.

use std::sync::Arc;

use async_trait::async_trait;
use eatsorder_domain::{AuthConfig, ClientError, HeaderValue};
use http::header::AUTHORIZATION;
use tracing::{debug, warn};

use super::authorization_header;
use super::coordinator::{RefreshCoordinator, RefreshOutcome};
use super::credentials::CredentialStore;
use super::session::SessionExpiryHandler;
use crate::http::{HttpResponse, PreparedRequest};
use crate::interceptor::{Interceptor, Verdict};

/// Attaches credentials and recovers from expired access credentials
pub struct AuthInterceptor {
    store: Arc<CredentialStore>,
    coordinator: RefreshCoordinator,
    expiry: Arc<dyn SessionExpiryHandler>,
    access_expired_status: u16,
    session_invalid_status: u16,
    authorization_scheme: Option<String>,
}

impl AuthInterceptor {
    /// Interceptor reading credentials from `store` and reporting session
    /// loss to `expiry`
    pub fn new(
        store: Arc<CredentialStore>,
        coordinator: RefreshCoordinator,
        expiry: Arc<dyn SessionExpiryHandler>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            store,
            coordinator,
            expiry,
            access_expired_status: auth.access_expired_status,
            session_invalid_status: auth.session_invalid_status,
            authorization_scheme: auth.authorization_scheme.clone(),
        }
    }

    fn current_authorization(&self) -> Option<HeaderValue> {
        let token = self.store.access_token()?;
        match authorization_header(self.authorization_scheme.as_deref(), &token) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Stored access credential cannot be sent as a header");
                None
            }
        }
    }

    fn session_lost(&self, reason: &str) -> Verdict {
        self.expiry.handle_session_expired();
        Verdict::Fail(ClientError::AuthenticationFailed(Some(reason.to_string())))
    }
}

#[async_trait]
impl Interceptor for AuthInterceptor {
    fn name(&self) -> &str {
        "auth"
    }

    fn prepare(&self, request: &mut PreparedRequest) {
        if !request.requires_authentication() {
            return;
        }
        if let Some(value) = self.current_authorization() {
            request.headers_mut().insert(AUTHORIZATION, value);
        }
    }

    async fn on_response(&self, request: &PreparedRequest, response: &HttpResponse) -> Verdict {
        let status = response.status();

        if status == self.access_expired_status {
            let sent = request.headers().get(AUTHORIZATION);
            if let (Some(sent), Some(current)) = (sent, self.current_authorization()) {
                if *sent != current {
                    debug!(path = request.path(), "Credentials rotated since dispatch, retrying");
                    return Verdict::Retry;
                }
            }

            return match self.coordinator.refresh().await {
                RefreshOutcome::Refreshed => Verdict::Retry,
                RefreshOutcome::Failed(reason) => {
                    warn!(path = request.path(), reason = %reason, "Access credential could not be refreshed");
                    self.session_lost("credential refresh failed")
                }
                RefreshOutcome::Stale => {
                    debug!(path = request.path(), "Session replaced during credential refresh");
                    Verdict::Fail(ClientError::AuthenticationFailed(Some(
                        "session changed during credential refresh".to_string(),
                    )))
                }
            };
        }

        if status == self.session_invalid_status {
            warn!(path = request.path(), status, "Session rejected by server");
            return self.session_lost("session is no longer valid");
        }

        Verdict::Continue
    }
}
