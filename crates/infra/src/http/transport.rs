//! HTTP transport
//!
//! The transport sends exactly one request and reads the whole response.
//! It never retries; retry policy belongs to the executor.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use eatsorder_domain::constants::DEFAULT_TIMEOUT_SECS;
use eatsorder_domain::{ClientConfig, ClientError, ClientResult};
use reqwest::Client as ReqwestClient;
use tracing::debug;

use super::request::PreparedRequest;
use super::response::HttpResponse;

/// Sends prepared requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the complete response
    ///
    /// # Errors
    ///
    /// `ClientError::Timeout`, `ClientError::Transport` or
    /// `ClientError::InvalidResponse` when no usable response was obtained.
    /// Non-success statuses are not errors at this level.
    async fn send(&self, request: &PreparedRequest) -> ClientResult<HttpResponse>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Transport configured from the client configuration
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if the HTTP client cannot be built
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = Self::builder().timeout(config.timeout());
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }

    fn map_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else if err.is_builder() {
            ClientError::Transport(format!("failed to build request: {err}"))
        } else if err.is_decode() || err.is_body() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> ClientResult<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|err| {
            debug!(method = %request.method(), path = request.path(), error = %err, "HTTP request failed");
            self.map_error(err)
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|err| self.map_error(err))?;

        Ok(HttpResponse::new(status, headers, body.to_vec(), started.elapsed()))
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS), user_agent: None }
    }
}

impl ReqwestTransportBuilder {
    /// Per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `User-Agent` sent with every request
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the transport
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if the HTTP client cannot be built
    pub fn build(self) -> ClientResult<ReqwestTransport> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|err| ClientError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(ReqwestTransport { client, timeout: self.timeout })
    }
}
