//! Request/response logging
//!
//! Stamps every request with an `X-Request-ID` and logs it. Credential
//! header values are never written to the log.

use async_trait::async_trait;
use eatsorder_domain::constants::{REFRESH_TOKEN_HEADER, REQUEST_ID_HEADER};
use eatsorder_domain::headers::header_str;
use eatsorder_domain::{HeaderName, HeaderValue};
use http::header::AUTHORIZATION;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Interceptor, Verdict};
use crate::http::{HttpResponse, PreparedRequest};

/// Logs requests and unhandled responses; always continues
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    /// Stateless; equivalent to `LoggingInterceptor`
    pub fn new() -> Self {
        Self
    }
}

fn is_redacted(name: &HeaderName, value: &HeaderValue) -> bool {
    value.is_sensitive() || *name == AUTHORIZATION || name.as_str() == REFRESH_TOKEN_HEADER
}

/// Header list rendered for logs with credential values masked
pub(crate) fn describe_headers(request: &PreparedRequest) -> String {
    request
        .headers()
        .iter()
        .map(|(name, value)| {
            if is_redacted(name, value) {
                format!("{name}: <redacted>")
            } else {
                format!("{name}: {}", value.to_str().unwrap_or("<binary>"))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    fn prepare(&self, request: &mut PreparedRequest) {
        if !request.headers().contains_key(REQUEST_ID_HEADER) {
            if let Ok(id) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
                request.headers_mut().insert(REQUEST_ID_HEADER, id);
            }
        }

        debug!(
            method = %request.method(),
            path = request.path(),
            request_id = header_str(request.headers(), REQUEST_ID_HEADER).unwrap_or_default(),
            headers = %describe_headers(request),
            body_bytes = request.body().map_or(0, <[u8]>::len),
            "prepared request"
        );
    }

    async fn on_response(&self, request: &PreparedRequest, response: &HttpResponse) -> Verdict {
        let request_id = header_str(request.headers(), REQUEST_ID_HEADER).unwrap_or_default();
        let body = response.body_preview().unwrap_or_default();

        if response.is_server_error() {
            warn!(
                method = %request.method(),
                path = request.path(),
                status = response.status(),
                elapsed_ms = response.elapsed().as_millis() as u64,
                request_id,
                body = %body,
                "server error response"
            );
        } else {
            debug!(
                method = %request.method(),
                path = request.path(),
                status = response.status(),
                elapsed_ms = response.elapsed().as_millis() as u64,
                request_id,
                body = %body,
                "non-success response"
            );
        }

        Verdict::Continue
    }
}
