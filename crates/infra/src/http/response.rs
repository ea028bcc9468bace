//! Response snapshot handed to interceptors and decoders

use std::time::Duration;

use eatsorder_domain::{ClientError, ClientResult, HeaderMap};
use serde::de::DeserializeOwned;

/// Longest body preview included in errors and logs
const PREVIEW_LIMIT: usize = 512;

/// A fully-read HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    elapsed: Duration,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: Vec<u8>, elapsed: Duration) -> Self {
        Self { status, headers, body, elapsed }
    }

    /// Status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers, including values that are not valid text
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Time between dispatch and the last body byte
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// 5xx status
    pub fn is_server_error(&self) -> bool {
        (500..=599).contains(&self.status)
    }

    /// Body as text, `None` when empty
    pub fn body_text(&self) -> Option<String> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(String::from_utf8_lossy(&self.body).into_owned())
    }

    /// Body text cut to a short preview for logs and error messages
    pub fn body_preview(&self) -> Option<String> {
        let text = self.body_text()?;
        if text.chars().count() <= PREVIEW_LIMIT {
            return Some(text);
        }
        let mut preview: String = text.chars().take(PREVIEW_LIMIT).collect();
        preview.push('…');
        Some(preview)
    }

    /// Decode the body as JSON
    ///
    /// An empty body (204, 304) decodes as JSON `null`, so `()` and
    /// `Option<_>` targets succeed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Decoding` if the body does not match `T`
    pub fn decode_json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        let result = if self.body.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(serde_json::Value::Null)
        } else {
            serde_json::from_slice(&self.body)
        };
        result.map_err(|e| ClientError::Decoding(e.to_string()))
    }

    /// Error for a status nobody handled
    pub fn into_server_error(self) -> ClientError {
        let message = self.body_preview();
        ClientError::Server { status: self.status, message }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, HeaderMap::new(), body.as_bytes().to_vec(), Duration::ZERO)
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Store {
        name: String,
    }

    #[test]
    fn test_decode_json_body() {
        let store: Store = response(200, r#"{"name":"Bibim House"}"#).decode_json().unwrap();
        assert_eq!(store, Store { name: "Bibim House".into() });
    }

    #[test]
    fn test_empty_body_decodes_as_unit_and_none() {
        let _: () = response(204, "").decode_json().unwrap();
        let store: Option<Store> = response(304, "").decode_json().unwrap();
        assert!(store.is_none());
    }

    #[test]
    fn test_empty_body_fails_for_struct() {
        let result: ClientResult<Store> = response(204, "").decode_json();
        assert!(matches!(result, Err(ClientError::Decoding(_))));
    }

    #[test]
    fn test_mismatched_shape_is_decoding_error() {
        let result: ClientResult<Store> = response(200, r#"{"title":"x"}"#).decode_json();
        assert!(matches!(result, Err(ClientError::Decoding(_))));
    }

    #[test]
    fn test_server_error_carries_body() {
        let error = response(500, "kitchen on fire").into_server_error();
        assert_eq!(
            error,
            ClientError::Server { status: 500, message: Some("kitchen on fire".into()) }
        );
        assert_eq!(response(503, "").into_server_error().status(), Some(503));
    }

    #[test]
    fn test_preview_is_truncated() {
        let long = "x".repeat(PREVIEW_LIMIT * 2);
        let preview = response(500, &long).body_preview().unwrap();
        assert_eq!(preview.chars().count(), PREVIEW_LIMIT + 1);
    }
}
