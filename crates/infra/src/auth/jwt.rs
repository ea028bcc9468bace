//! JWT expiry inspection
//!
//! Only the `exp` claim of the payload is read. The signature is not
//! verified; the backend does that. Anything that cannot be read counts as
//! expired.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};

/// Expiry timestamp of `token`, `None` if it cannot be determined
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    let seconds = exp.as_i64().or_else(|| exp.as_f64().map(|value| value as i64))?;

    Utc.timestamp_opt(seconds, 0).single()
}

/// `true` when `token` expires within `leeway` of `now`, or has no readable
/// expiry
pub fn is_expired_at(token: &str, leeway: Duration, now: DateTime<Utc>) -> bool {
    let Some(expires_at) = expires_at(token) else {
        return true;
    };
    let Ok(leeway) = chrono::Duration::from_std(leeway) else {
        return true;
    };
    match now.checked_add_signed(leeway) {
        Some(deadline) => deadline >= expires_at,
        None => true,
    }
}

/// [`is_expired_at`] against the current time
pub fn is_expired(token: &str, leeway: Duration) -> bool {
    is_expired_at(token, leeway, Utc::now())
}
