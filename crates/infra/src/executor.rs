//! Request execution
//!
//! [`RawExecutor`] is build → send → decode with no interceptors; the
//! refresh call goes through it. [`RequestExecutor`] wraps it with the
//! interceptor chain and the bounded retry loop.

use std::sync::Arc;

use eatsorder_domain::constants::{RAW_SUCCESS_STATUS_RANGE, SUCCESS_STATUS_RANGE};
use eatsorder_domain::{ClientError, ClientResult, Endpoint};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::http::{HttpResponse, HttpTransport, PreparedRequest, RequestFactory};
use crate::interceptor::{InterceptorChain, Verdict};

/// Automatic retries allowed per logical request
pub const MAX_AUTOMATIC_RETRIES: u32 = 1;

/// Executes requests without any interceptor
#[derive(Clone)]
pub struct RawExecutor {
    factory: RequestFactory,
    transport: Arc<dyn HttpTransport>,
}

impl RawExecutor {
    /// Executor building requests with `factory` and sending them on `transport`
    pub fn new(factory: RequestFactory, transport: Arc<dyn HttpTransport>) -> Self {
        Self { factory, transport }
    }

    /// Factory that turns endpoints into prepared requests
    pub fn factory(&self) -> &RequestFactory {
        &self.factory
    }

    /// Send an already prepared request, logging dispatch and receipt
    pub async fn send(&self, request: &PreparedRequest) -> ClientResult<HttpResponse> {
        debug!(method = %request.method(), path = request.path(), "sending HTTP request");

        let response = self.transport.send(request).await?;

        debug!(
            method = %request.method(),
            path = request.path(),
            status = response.status(),
            elapsed_ms = response.elapsed().as_millis() as u64,
            "received HTTP response"
        );
        Ok(response)
    }

    /// Build, send and decode `endpoint` with no interceptors
    ///
    /// Only 2xx counts as success here.
    ///
    /// # Errors
    ///
    /// Any build or transport error, `ClientError::Server` for a non-2xx
    /// status, `ClientError::Decoding` for a body that does not match `T`
    #[instrument(skip(self, endpoint), fields(method = %endpoint.method(), path = endpoint.path()))]
    pub async fn execute<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> ClientResult<T> {
        let request = self.factory.build(endpoint)?;
        let response = self.send(&request).await?;

        if RAW_SUCCESS_STATUS_RANGE.contains(&response.status()) {
            response.decode_json()
        } else {
            Err(response.into_server_error())
        }
    }
}

impl std::fmt::Debug for RawExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawExecutor").field("factory", &self.factory).finish_non_exhaustive()
    }
}

/// Executes requests through the interceptor chain with bounded retry
#[derive(Clone, Debug)]
pub struct RequestExecutor {
    raw: RawExecutor,
    chain: InterceptorChain,
}

impl RequestExecutor {
    pub fn new(raw: RawExecutor, chain: InterceptorChain) -> Self {
        Self { raw, chain }
    }

    pub fn raw(&self) -> &RawExecutor {
        &self.raw
    }

    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Execute `endpoint` and decode the body into `T`
    ///
    /// Statuses 200–304 are success. Anything else goes to the interceptor
    /// chain; a retry verdict re-prepares and resends the request at most
    /// [`MAX_AUTOMATIC_RETRIES`] times.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidUrl` / `ClientError::Encoding` before sending
    /// - transport errors, never retried
    /// - `ClientError::Decoding` for a success body that does not match `T`
    /// - the error of a `Fail` verdict
    /// - `ClientError::Server` when every interceptor continued
    /// - `ClientError::MaxRetriesExceeded` when a retry is requested again
    #[instrument(skip(self, endpoint), fields(method = %endpoint.method(), path = endpoint.path()))]
    pub async fn execute<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> ClientResult<T> {
        let template = self.raw.factory().build(endpoint)?;
        let mut retries = 0;

        loop {
            let mut request = template.clone();
            self.chain.prepare(&mut request);

            let response = self.raw.send(&request).await?;
            if SUCCESS_STATUS_RANGE.contains(&response.status()) {
                return response.decode_json();
            }

            match self.chain.on_response(&request, &response).await {
                Verdict::Continue => return Err(response.into_server_error()),
                Verdict::Retry | Verdict::Fail(ClientError::AuthRetryNeeded) => {
                    if retries >= MAX_AUTOMATIC_RETRIES {
                        warn!(status = response.status(), retries, "retry budget exhausted");
                        return Err(ClientError::MaxRetriesExceeded);
                    }
                    retries += 1;
                    debug!(status = response.status(), retry = retries, "retrying request");
                }
                Verdict::Fail(error) => return Err(error),
            }
        }
    }

    /// Execute `endpoint` without interceptors
    ///
    /// # Errors
    ///
    /// See [`RawExecutor::execute`]
    pub async fn raw_execute<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> ClientResult<T> {
        self.raw.execute(endpoint).await
    }
}
