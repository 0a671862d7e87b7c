//! Logging setup utilities for the Doorstep chat application.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the library crate and the binary. It can be overridden
/// with the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "doorstep_server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use doorstep_shared::logger::setup_logger;
///
/// setup_logger("doorstep_server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the default filter directive used when `RUST_LOG` is not set.
///
/// Binary names are normalized to crate-style identifiers (`-` becomes `_`),
/// and the request tracing emitted by `tower_http` follows the same level.
pub fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    let target = binary_name.replace('-', "_");
    format!(
        "doorstep_server={level},{target}={level},tower_http={level}",
        level = default_log_level,
    )
}
