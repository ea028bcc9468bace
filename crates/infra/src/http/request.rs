//! Request construction
//!
//! Turns an [`Endpoint`] into a [`PreparedRequest`]. Everything but the
//! headers of a prepared request is fixed at build time, which is what keeps
//! interceptor `prepare` hooks from touching the method or body.

use eatsorder_domain::constants::JSON_CONTENT_TYPE;
use eatsorder_domain::headers::merge_headers;
use eatsorder_domain::{ClientConfig, ClientError, ClientResult, Endpoint, HeaderMap, HeaderValue, Method};
use http::header::CONTENT_TYPE;
use url::Url;

/// A concrete request ready for the interceptor chain and the transport
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    requires_authentication: bool,
}

impl PreparedRequest {
    /// Request method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Fully resolved URL, query included
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Path component of the resolved URL, for logging
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Headers as they will be sent
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The only mutable part of a prepared request
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Serialized body, if any
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Whether the access credential must be attached
    pub fn requires_authentication(&self) -> bool {
        self.requires_authentication
    }
}

/// Builds prepared requests from endpoint descriptors
#[derive(Debug, Clone, Default)]
pub struct RequestFactory {
    default_headers: HeaderMap,
}

impl RequestFactory {
    /// Factory that merges `default_headers` under every endpoint's headers
    pub fn new(default_headers: HeaderMap) -> Self {
        Self { default_headers }
    }

    /// Default headers taken from the client configuration (API key and
    /// configured extras)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidHeader` if a configured header is
    /// malformed
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self::new(config.request_headers()?))
    }

    /// Headers merged under every request
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Build a request for `endpoint`
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidUrl` if the base URL is not an absolute
    ///   http(s) URL
    /// - `ClientError::Encoding` if the body cannot be serialized
    pub fn build(&self, endpoint: &Endpoint) -> ClientResult<PreparedRequest> {
        let url = resolve_url(endpoint.base_url(), endpoint.path(), endpoint.query_items())?;

        let mut headers = self.default_headers.clone();
        merge_headers(&mut headers, endpoint.headers());

        let body = match endpoint.body() {
            Some(value) => {
                let bytes =
                    serde_json::to_vec(value).map_err(|e| ClientError::Encoding(e.to_string()))?;
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                }
                Some(bytes)
            }
            None => None,
        };

        Ok(PreparedRequest {
            method: endpoint.method().clone(),
            url,
            headers,
            body,
            requires_authentication: endpoint.requires_authentication(),
        })
    }
}

fn resolve_url(base: &str, path: &str, query: &[(String, String)]) -> ClientResult<Url> {
    let mut url = Url::parse(base).map_err(|e| ClientError::InvalidUrl(format!("{base}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl(format!("{base}: not an absolute http(s) URL")));
    }

    let path = path.trim_start_matches('/');
    if !path.is_empty() {
        let joined = format!("{}/{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
    }

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}
