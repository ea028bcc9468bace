//! # EatsOrder Infrastructure
//!
//! The authenticated HTTP client core.
//!
//! This crate contains:
//! - Request construction and the `reqwest` transport
//! - The interceptor chain and the executor with bounded retry
//! - Credential storage (keychain, file, memory) and the session dispatcher
//! - Single-flight credential refresh
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Builds on the pure types of `eatsorder-domain`
//! - Contains all "impure" code (network, keychain, file system)
//! - [`ApiClient`] wires everything together

pub mod auth;
pub mod client;
pub mod config;
pub mod executor;
pub mod http;
pub mod interceptor;
pub mod observability;

// Re-export commonly used items
pub use auth::{
    AuthInterceptor, CredentialBackend, CredentialStore, CredentialStoreError, FileBackend,
    KeychainBackend, MemoryBackend, RefreshCoordinator, RefreshOutcome, Session, SessionObserver,
};
pub use client::{ApiClient, ApiClientBuilder};
pub use executor::{RawExecutor, RequestExecutor, MAX_AUTOMATIC_RETRIES};
pub use http::{HttpResponse, HttpTransport, PreparedRequest, ReqwestTransport, RequestFactory};
pub use interceptor::{Interceptor, InterceptorChain, LoggingInterceptor, Verdict};
pub use observability::{init_tracing, TracingFormat};
