//! Key-value store client abstraction.

mod redis_store;

pub use redis_store::{RedisStore, RedisStoreParameters};

use async_trait::async_trait;
use cachet_core::StoreResult;
use shaku::Interface;
use std::time::Duration;

/// Narrow request/response interface to the key-value store.
///
/// Keys passed here are always full (namespaced) keys. Each call is exactly
/// one round trip; implementations must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreClient: Interface {
    /// Stores `value` at `key`, expiring after `ttl` when given.
    ///
    /// Returns `true` if the store accepted the write.
    fn string_set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<bool>;

    /// Reads the value at `key`, `None` when absent.
    fn string_get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Checks if `key` exists.
    fn key_exists(&self, key: &str) -> StoreResult<bool>;

    /// Deletes `key`; returns `true` if it existed.
    fn key_delete(&self, key: &str) -> StoreResult<bool>;

    /// Non-blocking [`StoreClient::string_set`].
    async fn string_set_async(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<bool>;

    /// Non-blocking [`StoreClient::string_get`].
    async fn string_get_async(&self, key: &str) -> StoreResult<Option<String>>;

    /// Non-blocking [`StoreClient::key_exists`].
    async fn key_exists_async(&self, key: &str) -> StoreResult<bool>;

    /// Non-blocking [`StoreClient::key_delete`].
    async fn key_delete_async(&self, key: &str) -> StoreResult<bool>;
}
