//! Authentication: credential storage, session state and refresh
//!
//! Ownership runs one way: the [`Session`] owns state transitions and writes
//! to the [`CredentialStore`]; the [`TokenRefresher`] drives the session
//! through a refresh; the [`RefreshCoordinator`] makes sure only one refresh
//! runs at a time; the [`AuthInterceptor`] consults all of them from inside
//! the request pipeline.

use eatsorder_domain::headers::parse_header_value;
use eatsorder_domain::{ClientResult, HeaderValue};
use http::header::AUTHORIZATION;

pub mod coordinator;
pub mod credentials;
pub mod interceptor;
pub mod jwt;
pub mod refresher;
pub mod session;
pub mod storage;

pub use coordinator::{CredentialRefresher, RefreshCoordinator, RefreshOutcome};
pub use credentials::{CredentialStore, CredentialStoreError, CredentialStoreResult};
pub use interceptor::AuthInterceptor;
pub use refresher::TokenRefresher;
pub use session::{RefreshTicket, Session, SessionExpiryHandler, SessionObserver};
pub use storage::{CredentialBackend, FileBackend, KeychainBackend, MemoryBackend};

/// `Authorization` header value for `token`, marked sensitive
pub(crate) fn authorization_header(scheme: Option<&str>, token: &str) -> ClientResult<HeaderValue> {
    let text = match scheme {
        Some(scheme) if !scheme.is_empty() => format!("{scheme} {token}"),
        _ => token.to_string(),
    };
    let mut value = parse_header_value(AUTHORIZATION.as_str(), &text)?;
    value.set_sensitive(true);
    Ok(value)
}
