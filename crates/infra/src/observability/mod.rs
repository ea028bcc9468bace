//! Tracing subscriber setup
//!
//! The library only emits `tracing` events. Applications that want them on
//! stdout call [`init_tracing`] once at startup; the filter comes from
//! `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Human-readable text
    #[default]
    Plain,
    /// One JSON object per event
    Json,
}

/// Install a global fmt subscriber
///
/// Returns `false` when a global subscriber was already installed, which is
/// left in place.
pub fn init_tracing(format: TracingFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = match format {
        TracingFormat::Plain => {
            tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init()
        }
        TracingFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .json()
            .try_init(),
    };

    match result {
        Ok(()) => {
            tracing::debug!(?format, "Tracing initialized");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_a_noop() {
        init_tracing(TracingFormat::Json);
        assert!(!init_tracing(TracingFormat::Plain));
    }
}
