//! Request interceptors
//!
//! An interceptor may add headers before a request is sent and may inspect a
//! non-success response to decide how the executor proceeds.

use async_trait::async_trait;
use eatsorder_domain::ClientError;

use crate::http::{HttpResponse, PreparedRequest};

pub mod chain;
pub mod logging;

pub use chain::InterceptorChain;
pub use logging::LoggingInterceptor;

/// Decision returned by [`Interceptor::on_response`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Let the next interceptor decide
    Continue,
    /// Send the request again (subject to the executor's retry budget)
    Retry,
    /// Stop and return this error to the caller
    Fail(ClientError),
}

impl Verdict {
    /// `true` for [`Verdict::Continue`]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// A single stage of the request pipeline
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Adjust headers before the request is sent
    fn prepare(&self, _request: &mut PreparedRequest) {}

    /// Inspect a response whose status is outside the success range
    async fn on_response(&self, _request: &PreparedRequest, _response: &HttpResponse) -> Verdict {
        Verdict::Continue
    }
}
