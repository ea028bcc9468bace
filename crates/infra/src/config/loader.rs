//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `EATSORDER_BASE_URL` is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, the result is validated before it is returned.
//!
//! ## Environment Variables
//! - `EATSORDER_BASE_URL`: Backend base URL (required)
//! - `EATSORDER_API_KEY`: Application key sent on every request
//! - `EATSORDER_TIMEOUT_SECS`: Request timeout in seconds
//! - `EATSORDER_ACCESS_EXPIRED_STATUS`: Status meaning "refresh and retry"
//! - `EATSORDER_SESSION_INVALID_STATUS`: Status meaning "session lost"
//! - `EATSORDER_REFRESH_PATH`: Path of the refresh endpoint
//! - `EATSORDER_AUTH_SCHEME`: Scheme prefixed to the access credential
//!
//! ## File Locations
//! The loader probes `eatsorder.{json,toml}` and `config.{json,toml}` in the
//! current working directory, then in its parent and grandparent.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use eatsorder_domain::{ClientConfig, ClientError, ClientResult};

const ENV_BASE_URL: &str = "EATSORDER_BASE_URL";
const ENV_API_KEY: &str = "EATSORDER_API_KEY";
const ENV_TIMEOUT_SECS: &str = "EATSORDER_TIMEOUT_SECS";
const ENV_ACCESS_EXPIRED_STATUS: &str = "EATSORDER_ACCESS_EXPIRED_STATUS";
const ENV_SESSION_INVALID_STATUS: &str = "EATSORDER_SESSION_INVALID_STATUS";
const ENV_REFRESH_PATH: &str = "EATSORDER_REFRESH_PATH";
const ENV_AUTH_SCHEME: &str = "EATSORDER_AUTH_SCHEME";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["eatsorder.json", "eatsorder.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ClientError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> ClientResult<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `EATSORDER_BASE_URL` is required; everything else falls back to
/// defaults.
///
/// # Errors
/// Returns `ClientError::Config` if the base URL is missing or a value
/// cannot be parsed
pub fn load_from_env() -> ClientResult<ClientConfig> {
    let mut config = ClientConfig::new(env_var(ENV_BASE_URL)?);

    config.api_key = optional_env(ENV_API_KEY);
    if let Some(timeout) = parsed_env::<u64>(ENV_TIMEOUT_SECS)? {
        config.timeout_secs = timeout;
    }
    if let Some(status) = parsed_env::<u16>(ENV_ACCESS_EXPIRED_STATUS)? {
        config.auth.access_expired_status = status;
    }
    if let Some(status) = parsed_env::<u16>(ENV_SESSION_INVALID_STATUS)? {
        config.auth.session_invalid_status = status;
    }
    if let Some(path) = optional_env(ENV_REFRESH_PATH) {
        config.auth.refresh_path = path;
    }
    config.auth.authorization_scheme = optional_env(ENV_AUTH_SCHEME);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ClientError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> ClientResult<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ClientError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ClientError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ClientError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> ClientResult<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ClientError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ClientError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(ClientError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    probe_from(&cwd)
}

fn probe_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(3)
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Get required environment variable
fn env_var(key: &str) -> ClientResult<String> {
    optional_env(key).ok_or_else(|| {
        ClientError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Non-empty environment variable
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parsed_env<T>(key: &str) -> ClientResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ClientError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}
