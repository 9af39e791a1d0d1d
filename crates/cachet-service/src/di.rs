//! Dependency injection module using Shaku.

use crate::{RedisStore, RedisStoreParameters, StoreClient};
use cachet_config::RedisConfig;
use cachet_core::StoreResult;
use parking_lot::Mutex;
use shaku::{module, HasComponent};
use std::sync::Arc;

module! {
    pub StoreModule {
        components = [RedisStore],
        providers = [],
    }
}

/// Builds the store module for the given Redis configuration.
///
/// A disabled configuration yields a store that rejects every call.
pub fn build_store_module(config: &RedisConfig) -> StoreResult<StoreModule> {
    let parameters = if config.enabled {
        let (client, pool) = RedisStore::open(config)?;
        RedisStoreParameters {
            client: Some(client),
            pool: Some(pool),
            timeout: config.connect_timeout(),
            blocking: Mutex::new(None),
        }
    } else {
        RedisStoreParameters {
            client: None,
            pool: None,
            timeout: config.connect_timeout(),
            blocking: Mutex::new(None),
        }
    };

    Ok(StoreModule::builder()
        .with_component_parameters::<RedisStore>(parameters)
        .build())
}

/// Trait for resolving the store client.
pub trait StoreResolver {
    /// Resolves the store client from the module.
    fn store(&self) -> Arc<dyn StoreClient>;
}

impl StoreResolver for StoreModule {
    fn store(&self) -> Arc<dyn StoreClient> {
        self.resolve()
    }
}
