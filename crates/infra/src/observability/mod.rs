//! Tracing subscriber bootstrap
//!
//! Libraries only emit `tracing` events; binaries and tests call one of the
//! initializers below once. A second call is a no-op, so test modules can
//! all call it freely.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Human readable output, filtered by `RUST_LOG` or `default_filter`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    fmt().with_env_filter(env_filter(default_filter)).with_target(false).try_init().is_ok()
}

/// One JSON object per event, for log shippers.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_json_tracing(default_filter: &str) -> bool {
    fmt()
        .json()
        .with_env_filter(env_filter(default_filter))
        .with_current_span(false)
        .try_init()
        .is_ok()
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}
