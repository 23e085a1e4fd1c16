//! Logging setup
//!
//! Diagnostics go through `tracing` to stderr so stdout stays reserved for
//! the human-readable status lines of a run.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Build the filter from `RUST_LOG`, falling back to the configured level
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Initialize the global tracing subscriber
pub fn init_tracing(log_level: &str, json: bool) {
    let layer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(build_filter(log_level))
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(build_filter(log_level))
            .boxed()
    };

    tracing_subscriber::registry().with(layer).init();
}
