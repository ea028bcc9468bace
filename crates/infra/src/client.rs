//! API client
//!
//! Composition root of the request pipeline: wires the request factory,
//! transport, session, refresh coordinator and interceptors into one
//! executor.

use std::sync::Arc;

use eatsorder_domain::{
    ClientConfig, ClientError, ClientResult, CredentialPair, Endpoint, Method, SessionEvent,
    SessionState,
};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::auth::{
    AuthInterceptor, CredentialStore, MemoryBackend, RefreshCoordinator, RefreshOutcome, Session,
    SessionExpiryHandler, SessionObserver, TokenRefresher,
};
use crate::executor::{RawExecutor, RequestExecutor};
use crate::http::{HttpTransport, ReqwestTransport, RequestFactory};
use crate::interceptor::{Interceptor, InterceptorChain, LoggingInterceptor};

/// Authenticated HTTP client
///
/// Cheap to share behind an `Arc`; every method takes `&self` and may be
/// called from many tasks at once.
pub struct ApiClient {
    config: ClientConfig,
    executor: RequestExecutor,
    session: Arc<Session>,
    coordinator: RefreshCoordinator,
}

impl ApiClient {
    /// Create a new builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Endpoint on the configured backend
    pub fn endpoint(&self, method: Method, path: impl Into<String>) -> Endpoint {
        Endpoint::new(method, self.config.base_url.clone(), path)
    }

    /// Execute `endpoint` through the interceptor chain
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::execute`]. Authentication failures have
    /// already moved the session to `Expired` when they are returned.
    pub async fn execute<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> ClientResult<T> {
        self.executor.execute(endpoint).await
    }

    /// Execute `endpoint` with no interceptors and no retry
    ///
    /// # Errors
    ///
    /// See [`RawExecutor::execute`]
    pub async fn raw_execute<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> ClientResult<T> {
        self.executor.raw_execute(endpoint).await
    }

    /// Record credentials from a sign-in, sign-up or social sign-in
    pub fn sign_in(&self, credentials: CredentialPair) -> SessionState {
        info!("Signing in");
        self.session.dispatch(SessionEvent::SessionBecameActive(credentials))
    }

    /// Sign out and forget credentials
    pub fn logout(&self) -> SessionState {
        info!("Signing out");
        self.session.dispatch(SessionEvent::LoggedOut)
    }

    /// Re-check the session, e.g. when the app returns to the foreground
    ///
    /// A stored but expired access credential is refreshed, joining any
    /// refresh already in flight. A failed refresh ends the session; a refresh
    /// overtaken by logout or a new sign-in leaves the current session alone.
    pub async fn check_session_validity(&self) -> SessionState {
        let store = self.session.credentials();
        if !store.is_logged_in() {
            debug!(state = ?self.session.state(), "No stored session to validate");
            return self.session.state();
        }

        if store.is_access_expired() {
            debug!("Stored access credential expired, refreshing");
            if let RefreshOutcome::Failed(reason) = self.coordinator.refresh().await {
                debug!(reason = %reason, "Refresh during validity check failed");
                self.session.handle_session_expired();
            }
        }

        self.session.state()
    }

    /// Current session state
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Receiver of session state changes
    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Register an observer of the session-expired signal
    pub fn add_session_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.session.add_observer(observer);
    }

    /// Credential store backing the session
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        self.session.credentials()
    }

    /// Interceptor names in the order they run
    pub fn interceptors(&self) -> Vec<&str> {
        self.executor.chain().names()
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("session", &self.session)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    credential_store: Option<Arc<CredentialStore>>,
    transport: Option<Arc<dyn HttpTransport>>,
    observers: Vec<Arc<dyn SessionObserver>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `store` for credentials (defaults to an in-memory store)
    pub fn credential_store(mut self, store: Arc<CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    /// Replace the default `reqwest` transport
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register a receiver of the session-expired signal
    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Append an interceptor after the built-in logging and auth stages
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if no configuration was set, the
    /// configuration is invalid, or the transport cannot be created
    pub fn build(self) -> ClientResult<ApiClient> {
        let config =
            self.config.ok_or_else(|| ClientError::Config("Client config not set".to_string()))?;
        config.validate()?;

        let store = match self.credential_store {
            Some(store) => store,
            None => Arc::new(
                CredentialStore::open(Arc::new(MemoryBackend::new()), config.auth.expiry_leeway())
                    .map_err(|e| ClientError::Config(e.to_string()))?,
            ),
        };
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config)?),
        };

        let raw = RawExecutor::new(RequestFactory::from_config(&config)?, transport);

        let session = Arc::new(Session::new(store.clone()));
        for observer in self.observers {
            session.add_observer(observer);
        }

        let refresher = Arc::new(TokenRefresher::new(
            raw.clone(),
            session.clone(),
            config.base_url.clone(),
            &config.auth,
        ));
        let coordinator = RefreshCoordinator::new(refresher);
        let auth = AuthInterceptor::new(store, coordinator.clone(), session.clone(), &config.auth);

        let mut chain = InterceptorChain::new(vec![
            Arc::new(LoggingInterceptor::new()) as Arc<dyn Interceptor>,
            Arc::new(auth) as Arc<dyn Interceptor>,
        ]);
        for interceptor in self.interceptors {
            chain.push(interceptor);
        }

        info!(base_url = %config.base_url, interceptors = ?chain.names(), "API client built");

        Ok(ApiClient { executor: RequestExecutor::new(raw, chain), config, session, coordinator })
    }
}
