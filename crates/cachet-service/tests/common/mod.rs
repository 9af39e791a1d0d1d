//! Common test infrastructure for cache service integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use cachet_core::{StoreError, StoreResult};
use cachet_service::StoreClient;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub command: &'static str,
    pub key: String,
}

/// In-memory store client.
///
/// Honors TTLs, records every call and can be switched into a failing mode
/// where each call returns a connection error.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
    calls: Mutex<Vec<StoreCall>>,
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Insert a raw value, bypassing the cache service.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), None));
    }

    /// Read a raw value, bypassing the cache service.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.live_value(key)
    }

    /// Returns all calls made so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, command: &'static str, key: &str) -> StoreResult<()> {
        self.calls.lock().unwrap().push(StoreCall {
            command,
            key: key.to_string(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection refused".to_string()));
        }
        Ok(())
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((_, Some(expires_at))) if *expires_at <= Instant::now() => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    fn string_set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<bool> {
        self.record("SET", key)?;
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(true)
    }

    fn string_get(&self, key: &str) -> StoreResult<Option<String>> {
        self.record("GET", key)?;
        Ok(self.live_value(key))
    }

    fn key_exists(&self, key: &str) -> StoreResult<bool> {
        self.record("EXISTS", key)?;
        Ok(self.live_value(key).is_some())
    }

    fn key_delete(&self, key: &str) -> StoreResult<bool> {
        self.record("DEL", key)?;
        let existed = self.live_value(key).is_some();
        self.entries.lock().unwrap().remove(key);
        Ok(existed)
    }

    async fn string_set_async(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<bool> {
        self.string_set(key, value, ttl)
    }

    async fn string_get_async(&self, key: &str) -> StoreResult<Option<String>> {
        self.string_get(key)
    }

    async fn key_exists_async(&self, key: &str) -> StoreResult<bool> {
        self.key_exists(key)
    }

    async fn key_delete_async(&self, key: &str) -> StoreResult<bool> {
        self.key_delete(key)
    }
}
