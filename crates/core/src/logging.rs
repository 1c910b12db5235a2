//! Structured logging infrastructure for mission control.
//!
//! This module provides centralized logging initialization with support
//! for structured JSON output and environment-based configuration.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the logging system with human-readable output.
///
/// `RUST_LOG` takes precedence over `default_level` when set.
///
/// # Example
/// ```no_run
/// use missionctl_core::logging;
///
/// logging::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize the logging system with JSON output for production environments.
///
/// # Example
/// ```no_run
/// use missionctl_core::logging;
///
/// logging::init_json("info");
/// tracing::info!(service = "mission-control", "Service started");
/// ```
pub fn init_json(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize logging according to the `[logging]` configuration section.
pub fn init_from_config(config: &LoggingConfig) {
    match config.format {
        LogFormat::Text => init(&config.level),
        LogFormat::Json => init_json(&config.level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_configured_level() {
        // Global subscriber installs once per process; build filters only.
        let _ = filter("debug");
        let _ = filter("missionctl_stream=trace,info");
    }
}
