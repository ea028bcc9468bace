//! Header parsing on top of the `http` header types
//!
//! Names and values are validated when they enter an endpoint or the
//! configuration, so a request that reaches the transport is always
//! well-formed.

pub use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::errors::{ClientError, ClientResult};

/// Parse a header name; any ASCII case is accepted
///
/// # Errors
///
/// Returns `ClientError::InvalidHeader` if `name` is not a valid token
pub fn parse_header_name(name: &str) -> ClientResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::InvalidHeader(format!("name '{name}': {e}")))
}

/// Parse a header value
///
/// The offending value is left out of the error since it may be a credential.
///
/// # Errors
///
/// Returns `ClientError::InvalidHeader` if `value` contains control
/// characters
pub fn parse_header_value(name: &str, value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::InvalidHeader(format!("value for '{name}': {e}")))
}

/// Build a header map from string pairs; a later pair replaces an earlier
/// one with the same name
///
/// # Errors
///
/// Returns `ClientError::InvalidHeader` on the first invalid name or value
pub fn header_map<I, K, V>(pairs: I) -> ClientResult<HeaderMap>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let (name, value) = (name.as_ref(), value.as_ref());
        headers.insert(parse_header_name(name)?, parse_header_value(name, value)?);
    }
    Ok(headers)
}

/// Overlay `overlay` on `base`
///
/// Every name present in `overlay` replaces all of its values in `base`.
pub fn merge_headers(base: &mut HeaderMap, overlay: &HeaderMap) {
    for name in overlay.keys() {
        base.remove(name);
    }
    for (name, value) in overlay {
        base.append(name.clone(), value.clone());
    }
}

/// Value of `name` as text, `None` when absent or not visible ASCII
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}
