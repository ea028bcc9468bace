//! Endpoint descriptors
//!
//! An [`Endpoint`] is an immutable description of one logical request. It
//! carries no behavior; the infra crate turns it into a concrete transport
//! request.

pub use http::Method;
use serde::Serialize;

use crate::errors::{ClientError, ClientResult};
use crate::headers::{parse_header_name, parse_header_value, HeaderMap, HeaderName, HeaderValue};

/// Description of a single logical request
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    base_url: String,
    path: String,
    method: Method,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
    requires_authentication: bool,
}

impl Endpoint {
    /// Start describing a request; authentication is not required by default
    pub fn new(method: Method, base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            method,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            requires_authentication: false,
        }
    }

    /// `GET` request
    pub fn get(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::GET, base_url, path)
    }

    /// `POST` request
    pub fn post(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::POST, base_url, path)
    }

    /// `PUT` request
    pub fn put(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::PUT, base_url, path)
    }

    /// `DELETE` request
    pub fn delete(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, base_url, path)
    }

    /// Append a query parameter; repeated keys are kept in order
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a header, replacing any value with the same name
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Parse and set a header, replacing any value with the same name
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidHeader` if `name` or `value` is not a
    /// valid header field
    pub fn try_header(self, name: &str, value: &str) -> ClientResult<Self> {
        let value = parse_header_value(name, value)?;
        Ok(self.header(parse_header_name(name)?, value))
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Encoding` if `body` cannot be serialized
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ClientResult<Self> {
        let value =
            serde_json::to_value(body).map_err(|e| ClientError::Encoding(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Mark the endpoint as requiring the caller's access credential
    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.requires_authentication = true;
        self
    }

    /// Backend origin, without the path
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path relative to the base URL
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Query parameters in insertion order
    pub fn query_items(&self) -> &[(String, String)] {
        &self.query
    }

    /// Endpoint-specific headers, applied over the client defaults
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// JSON body, if any
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Whether the access credential is attached
    pub fn requires_authentication(&self) -> bool {
        self.requires_authentication
    }
}
