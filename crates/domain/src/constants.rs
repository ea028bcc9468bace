//! Backend contract constants
//!
//! Defaults only; every value here can be overridden through `ClientConfig`.

/// Status returned when the access credential expired and must be refreshed
pub const DEFAULT_ACCESS_EXPIRED_STATUS: u16 = 419;

/// Status returned when the session cannot be recovered by a refresh
pub const DEFAULT_SESSION_INVALID_STATUS: u16 = 418;

/// Path of the credential refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Header carrying the application key
pub const DEFAULT_API_KEY_HEADER: &str = "SeSACKey";

/// Per-request transport timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Seconds before `exp` at which an access credential counts as expired
pub const DEFAULT_EXPIRY_LEEWAY_SECS: u64 = 30;

// Header names below are lowercase so they can be used with
// `HeaderName::from_static`; names are case-insensitive on the wire.

/// Header the refresh endpoint reads the refresh credential from
pub const REFRESH_TOKEN_HEADER: &str = "refreshtoken";

/// Correlation id stamped by the logging interceptor
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Content type of request bodies
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Inclusive status range treated as success by the intercepted path.
/// 304 is included so conditional GETs decode instead of failing.
pub const SUCCESS_STATUS_RANGE: std::ops::RangeInclusive<u16> = 200..=304;

/// Success range of the raw path used by the refresh call
pub const RAW_SUCCESS_STATUS_RANGE: std::ops::RangeInclusive<u16> = 200..=299;
