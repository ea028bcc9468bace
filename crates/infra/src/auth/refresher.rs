//! Credential exchange against the refresh endpoint
//!
//! Goes through the raw executor so a rejected refresh can never re-enter
//! the interceptor chain.

use std::sync::Arc;

use async_trait::async_trait;
use eatsorder_domain::constants::REFRESH_TOKEN_HEADER;
use eatsorder_domain::headers::parse_header_value;
use eatsorder_domain::{
    AuthConfig, ClientResult, CredentialPair, Endpoint, HeaderName, SessionEvent, SessionState,
};
use http::header::AUTHORIZATION;
use tracing::{info, warn};

use super::authorization_header;
use super::coordinator::{CredentialRefresher, RefreshOutcome};
use super::session::{RefreshTicket, Session};
use crate::executor::RawExecutor;

/// Refreshes credentials and records the result in the session
pub struct TokenRefresher {
    raw: RawExecutor,
    session: Arc<Session>,
    base_url: String,
    refresh_path: String,
    authorization_scheme: Option<String>,
}

impl TokenRefresher {
    /// Refresher calling `auth.refresh_path` under `base_url` through `raw`
    pub fn new(
        raw: RawExecutor,
        session: Arc<Session>,
        base_url: impl Into<String>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            raw,
            session,
            base_url: base_url.into(),
            refresh_path: auth.refresh_path.clone(),
            authorization_scheme: auth.authorization_scheme.clone(),
        }
    }

    fn refresh_endpoint(
        &self,
        refresh_token: &str,
        access_token: Option<&str>,
    ) -> ClientResult<Endpoint> {
        let mut refresh_value = parse_header_value(REFRESH_TOKEN_HEADER, refresh_token)?;
        refresh_value.set_sensitive(true);

        let mut endpoint = Endpoint::get(self.base_url.clone(), self.refresh_path.clone())
            .header(HeaderName::from_static(REFRESH_TOKEN_HEADER), refresh_value);
        if let Some(access_token) = access_token {
            endpoint = endpoint.header(
                AUTHORIZATION,
                authorization_header(self.authorization_scheme.as_deref(), access_token)?,
            );
        }
        Ok(endpoint)
    }

    fn fail(&self, ticket: RefreshTicket, reason: impl Into<String>) -> RefreshOutcome {
        let reason = reason.into();
        match self.session.finish_refresh(ticket, SessionEvent::RefreshFailed) {
            Some(_) => {
                warn!(reason = %reason, "Credential refresh failed");
                RefreshOutcome::Failed(reason)
            }
            None => {
                info!(reason = %reason, "Refresh failed after the session was replaced, ignoring");
                RefreshOutcome::Stale
            }
        }
    }
}

#[async_trait]
impl CredentialRefresher for TokenRefresher {
    async fn refresh_credentials(&self) -> RefreshOutcome {
        let Some(ticket) = self.session.begin_refresh() else {
            let state = self.session.state();
            return RefreshOutcome::Failed(format!("session is {state:?}, not refreshable"));
        };

        let store = self.session.credentials();
        let Some(refresh_token) = store.refresh_token() else {
            return self.fail(ticket, "no refresh credential stored");
        };
        let access_token = store.access_token();
        let endpoint = match self.refresh_endpoint(&refresh_token, access_token.as_deref()) {
            Ok(endpoint) => endpoint,
            Err(e) => return self.fail(ticket, e.to_string()),
        };

        match self.raw.execute::<CredentialPair>(&endpoint).await {
            Ok(pair) if pair.is_complete() => {
                match self.session.finish_refresh(ticket, SessionEvent::RefreshSucceeded(pair)) {
                    Some(SessionState::Active) => {
                        info!("Credentials refreshed");
                        RefreshOutcome::Refreshed
                    }
                    Some(state) => {
                        RefreshOutcome::Failed(format!("session is {state:?} after refresh"))
                    }
                    None => {
                        info!("Session replaced while refreshing, new credentials discarded");
                        RefreshOutcome::Stale
                    }
                }
            }
            Ok(_) => self.fail(ticket, "refresh response is missing a credential"),
            Err(e) => self.fail(ticket, e.to_string()),
        }
    }
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("base_url", &self.base_url)
            .field("refresh_path", &self.refresh_path)
            .finish_non_exhaustive()
    }
}
