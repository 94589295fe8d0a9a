//! Logging initialization and configuration.

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "tmux_relay=info";

/// Try to initialize logging from `RUST_LOG`.
///
/// Falls back to [`DEFAULT_FILTER`] when `RUST_LOG` is unset or invalid.
/// Returns `Err` if a subscriber is already installed.
pub fn try_init() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

/// Initialize logging from a configured level or directive string.
///
/// A bare level such as `debug` is scoped to this crate; anything
/// containing `=` or `,` is taken as a full `EnvFilter` directive.
pub fn init_with_filter(level: &str) -> Result<(), TryInitError> {
    let directive = filter_directive(level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

/// Compact lines on stderr; stdout carries the console replies.
fn install(filter: EnvFilter) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
}

fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("tmux_relay={}", level)
    }
}
