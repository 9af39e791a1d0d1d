//! Configuration loader with layered sources.

use crate::AppConfig;
use cachet_core::CacheError;
use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `{dir}/default.toml` - Default values
    /// 2. `{dir}/{environment}.toml` - Environment-specific overrides
    /// 3. `{dir}/local.toml` - Local overrides
    /// 4. Environment variables with `CACHET__` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, CacheError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, CacheError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), CacheError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &str) -> Result<AppConfig, CacheError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("CACHET_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("CACHET")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_cache_error)?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_cache_error)?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Validates the configuration.
    fn validate_config(config: &AppConfig) -> Result<(), CacheError> {
        if config.redis.enabled {
            if config.redis.url.is_empty() {
                return Err(CacheError::Configuration("Redis URL is required".to_string()));
            }
            if config.redis.pool_size == 0 {
                return Err(CacheError::Configuration(
                    "Redis pool size must be greater than zero".to_string(),
                ));
            }
            if config.redis.connect_timeout_secs == 0 {
                return Err(CacheError::Configuration(
                    "Redis connect timeout must be greater than zero".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn config_error_to_cache_error(err: ConfigError) -> CacheError {
    CacheError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeNameHandling;
    use std::fs;

    #[tokio::test]
    async fn test_missing_dir_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().to_string_lossy()).unwrap();
        let config = loader.get().await;
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert!(config.cache.key_prefix.is_none());
        assert!(config.serializer.omit_null_fields);
    }

    #[tokio::test]
    async fn test_default_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
[redis]
url = "redis://cache.internal:6380"

[cache]
key_prefix = "app:"

[serializer]
type_names = "objects"
"#,
        )
        .unwrap();

        let loader = ConfigLoader::new(dir.path().to_string_lossy()).unwrap();
        let config = loader.get().await;
        assert_eq!(config.redis.url, "redis://cache.internal:6380");
        assert_eq!(config.redis.pool_size, 10);
        assert_eq!(config.cache.prefix().apply("k"), "app:k");
        assert_eq!(config.serializer.type_names, TypeNameHandling::Objects);
    }

    #[tokio::test]
    async fn test_reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().to_string_lossy()).unwrap();
        assert!(loader.get().await.cache.key_prefix.is_none());

        fs::write(dir.path().join("local.toml"), "[cache]\nkey_prefix = \"v2:\"\n").unwrap();
        loader.reload().await.unwrap();
        assert_eq!(loader.get().await.cache.key_prefix.as_deref(), Some("v2:"));
    }

    #[tokio::test]
    async fn test_empty_redis_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("default.toml"), "[redis]\nurl = \"\"\n").unwrap();

        let err = ConfigLoader::new(dir.path().to_string_lossy()).err().unwrap();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }
}
