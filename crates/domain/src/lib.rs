//! # EatsOrder Domain
//!
//! Pure data for the EatsOrder HTTP client core.
//!
//! This crate contains:
//! - Endpoint descriptors and header parsing
//! - The credential pair issued by the backend
//! - The session state machine (pure transition table)
//! - The client error taxonomy
//! - Configuration structures and backend contract constants
//!
//! ## Architecture
//! - No dependencies on other EatsOrder crates
//! - No I/O; everything impure lives in `eatsorder-infra`

pub mod config;
pub mod constants;
pub mod credentials;
pub mod endpoint;
pub mod errors;
pub mod headers;
pub mod session;

// Re-export commonly used items
pub use config::{AuthConfig, ClientConfig};
pub use credentials::CredentialPair;
pub use endpoint::{Endpoint, Method};
pub use errors::{ClientError, ClientErrorCategory, ClientResult};
pub use headers::{HeaderMap, HeaderName, HeaderValue};
pub use session::{CredentialEffect, SessionEvent, SessionState, Transition};
