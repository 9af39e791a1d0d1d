//! Application configuration structures.

use crate::SerializerSettings;
use cachet_core::{KeyPrefix, LogFormat, TelemetryConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Redis configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Cache façade configuration.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Serializer configuration.
    #[serde(default)]
    pub serializer: SerializerSettings,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "cachet".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Connection pool size for async calls.
    pub pool_size: usize,
    /// Enable Redis (can be disabled for local development).
    pub enabled: bool,
    /// Connection timeout in seconds, also bounding each blocking call.
    pub connect_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            enabled: true,
            connect_timeout_secs: 5,
        }
    }
}

impl RedisConfig {
    /// Returns the connection timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Cache façade configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Namespace prepended verbatim to every key.
    pub key_prefix: Option<String>,
}

impl CacheSettings {
    /// Returns the configured namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> KeyPrefix {
        KeyPrefix::from(self.key_prefix.clone())
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive.
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: LogFormat,
    /// Record cache metrics through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let telemetry = TelemetryConfig::default();
        Self {
            log_level: telemetry.log_level,
            log_format: telemetry.log_format,
            metrics_enabled: true,
        }
    }
}

impl ObservabilityConfig {
    /// Returns the telemetry settings for `init_telemetry`.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            log_level: self.log_level.clone(),
            log_format: self.log_format,
            ..TelemetryConfig::default()
        }
    }
}
