//! Logging initialization.
//!
//! Installs a `tracing` subscriber with an `EnvFilter` and a console layer.
//! `RUST_LOG` takes precedence over the configured level.

#[cfg(feature = "telemetry")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::CacheResult;
use serde::{Deserialize, Serialize};

/// Console log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default filter directive (e.g. `info`, `cachet=debug`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Console output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Whether to include the event target.
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

fn default_log_level() -> String {
    "info,cachet=debug".to_string()
}

fn default_with_target() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            with_target: default_with_target(),
        }
    }
}

/// Initialize logging to stderr with the given configuration.
///
/// # Errors
///
/// Returns a configuration error if a global subscriber is already installed
/// or the filter directive is invalid.
#[cfg(feature = "telemetry")]
pub fn init_telemetry(config: &TelemetryConfig) -> CacheResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.log_level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(config.with_target)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| crate::CacheError::Configuration(format!("Failed to install subscriber: {}", e)))?;

    tracing::debug!(
        log_level = %config.log_level,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(feature = "telemetry")]
fn parse_filter(log_level: &str) -> CacheResult<EnvFilter> {
    EnvFilter::try_new(log_level)
        .map_err(|e| crate::CacheError::Configuration(format!("Invalid log level '{}': {}", log_level, e)))
}

/// Placeholder for when telemetry feature is disabled.
#[cfg(not(feature = "telemetry"))]
pub fn init_telemetry(_config: &TelemetryConfig) -> CacheResult<()> {
    Ok(())
}
