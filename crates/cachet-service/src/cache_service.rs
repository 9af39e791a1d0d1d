//! The cache façade.

use crate::metrics::{record_lookup, record_operation, record_store_error, record_suppressed};
use crate::observer::{ErrorObserver, NoopObserver};
use crate::serialization;
use crate::store::StoreClient;
use cachet_config::{AppConfig, SerializerSettings};
use cachet_core::{validate_key, CacheError, CacheResult, KeyPrefix, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache service over a [`StoreClient`].
///
/// Holds only immutable configuration, so one instance can be shared across
/// threads and tasks for the life of the process.
///
/// Payload conventions:
/// - a `String` or `&'static str` payload is stored verbatim, anything else
///   as JSON;
/// - a payload that encodes to JSON `null` (for example `None`) is never
///   written, and `add` returns `false`;
/// - reads of absent or empty values yield `T::default()`.
pub struct CacheService<S: StoreClient + ?Sized = dyn StoreClient> {
    store: Arc<S>,
    prefix: KeyPrefix,
    settings: SerializerSettings,
    observer: Arc<dyn ErrorObserver>,
}

impl<S: StoreClient + ?Sized> Clone for CacheService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: self.prefix.clone(),
            settings: self.settings,
            observer: Arc::clone(&self.observer),
        }
    }
}

impl<S: StoreClient + ?Sized> CacheService<S> {
    /// Create a cache service with no prefix, default serializer settings and
    /// no error observer.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            prefix: KeyPrefix::none(),
            settings: SerializerSettings::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Create a cache service configured from `config`.
    #[must_use]
    pub fn from_config(store: Arc<S>, config: &AppConfig) -> Self {
        Self::new(store)
            .with_prefix(config.cache.prefix())
            .with_settings(config.serializer)
    }

    /// Set the namespace prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the serializer settings.
    #[must_use]
    pub fn with_settings(mut self, settings: SerializerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the observer for errors suppressed by `try_*` operations.
    #[must_use]
    pub fn with_observer(mut self, observer: impl ErrorObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Set a shared observer.
    #[must_use]
    pub fn with_shared_observer(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns the namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    /// Returns the serializer settings.
    #[must_use]
    pub fn settings(&self) -> &SerializerSettings {
        &self.settings
    }

    /// Validates `key` and returns the key the store will see.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::EmptyKey`] for an empty key.
    pub fn full_key(&self, key: &str) -> CacheResult<String> {
        Ok(self.prefix.apply(validate_key(key)?))
    }

    // ============ Add ============

    /// Stores `data` under `key`.
    ///
    /// Returns the store's answer, or `false` without a store call when
    /// `data` is null.
    ///
    /// # Errors
    ///
    /// [`CacheError::EmptyKey`], [`CacheError::InvalidArgument`] for a zero
    /// TTL, [`CacheError::Serialization`] or [`CacheError::Store`].
    pub fn add<T: Serialize + Any>(&self, key: &str, data: &T, ttl: Option<Duration>) -> CacheResult<bool> {
        let Some((full_key, value)) = self.prepare_add(key, data, ttl)? else {
            return Ok(false);
        };

        record_operation("add");
        let stored = Self::observe("add", self.store.string_set(&full_key, &value, ttl))?;
        debug!("Cached key '{}' (stored: {}, ttl: {:?})", full_key, stored, ttl);
        Ok(stored)
    }

    /// Non-blocking [`CacheService::add`].
    ///
    /// # Errors
    ///
    /// Same as [`CacheService::add`].
    pub async fn add_async<T: Serialize + Any>(
        &self,
        key: &str,
        data: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        let Some((full_key, value)) = self.prepare_add(key, data, ttl)? else {
            return Ok(false);
        };

        record_operation("add");
        let stored = Self::observe("add", self.store.string_set_async(&full_key, &value, ttl).await)?;
        debug!("Cached key '{}' (stored: {}, ttl: {:?})", full_key, stored, ttl);
        Ok(stored)
    }

    /// Like [`CacheService::add`], but store and serialization failures yield
    /// `false` unless `propagate_on_failure` is set.
    ///
    /// # Errors
    ///
    /// Always returns invalid-argument errors; other errors only when
    /// `propagate_on_failure` is set.
    pub fn try_add<T: Serialize + Any>(
        &self,
        key: &str,
        data: &T,
        ttl: Option<Duration>,
        propagate_on_failure: bool,
    ) -> CacheResult<bool> {
        let outcome = self.add(key, data, ttl);
        self.recover("add", outcome, propagate_on_failure, || false)
    }

    /// Non-blocking [`CacheService::try_add`].
    ///
    /// # Errors
    ///
    /// Same as [`CacheService::try_add`].
    pub async fn try_add_async<T: Serialize + Any>(
        &self,
        key: &str,
        data: &T,
        ttl: Option<Duration>,
        propagate_on_failure: bool,
    ) -> CacheResult<bool> {
        let outcome = self.add_async(key, data, ttl).await;
        self.recover("add", outcome, propagate_on_failure, || false)
    }

    // ============ Get ============

    /// Reads the value under `key`, or `T::default()` when absent.
    ///
    /// # Errors
    ///
    /// [`CacheError::EmptyKey`], [`CacheError::Decode`] for malformed stored
    /// text, or [`CacheError::Store`].
    pub fn get<T: DeserializeOwned + Default + Any>(&self, key: &str) -> CacheResult<T> {
        Ok(self.fetch(key)?.unwrap_or_default())
    }

    /// Non-blocking [`CacheService::get`].
    ///
    /// # Errors
    ///
    /// Same as [`CacheService::get`].
    pub async fn get_async<T: DeserializeOwned + Default + Any>(&self, key: &str) -> CacheResult<T> {
        Ok(self.fetch_async(key).await?.unwrap_or_default())
    }

    /// Reads the value under `key`, reporting whether one was found.
    ///
    /// Absence and suppressed failures both yield `(false, T::default())`.
    ///
    /// # Errors
    ///
    /// Always returns [`CacheError::EmptyKey`]; other errors only when
    /// `propagate_on_failure` is set.
    pub fn try_get<T: DeserializeOwned + Default + Any>(
        &self,
        key: &str,
        propagate_on_failure: bool,
    ) -> CacheResult<(bool, T)> {
        let outcome = self.fetch(key).map(found_or_default);
        self.recover("get", outcome, propagate_on_failure, not_found)
    }

    /// Non-blocking [`CacheService::try_get`].
    ///
    /// # Errors
    ///
    /// Same as [`CacheService::try_get`].
    pub async fn try_get_async<T: DeserializeOwned + Default + Any>(
        &self,
        key: &str,
        propagate_on_failure: bool,
    ) -> CacheResult<(bool, T)> {
        let outcome = self.fetch_async(key).await.map(found_or_default);
        self.recover("get", outcome, propagate_on_failure, not_found)
    }

    // ============ Exists / Delete ============

    /// Checks if `key` exists.
    ///
    /// # Errors
    ///
    /// [`CacheError::EmptyKey`] or [`CacheError::Store`].
    pub fn exists(&self, key: &str) -> CacheResult<bool> {
        let full_key = self.full_key(key)?;
        record_operation("exists");
        Self::observe("exists", self.store.key_exists(&full_key))
    }

    /// Non-blocking [`CacheService::exists`].
    ///
    /// # Errors
    ///
    /// Same as [`CacheService::exists`].
    pub async fn exists_async(&self, key: &str) -> CacheResult<bool> {
        let full_key = self.full_key(key)?;
        record_operation("exists");
        Self::observe("exists", self.store.key_exists_async(&full_key).await)
    }

    /// Deletes `key`; returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// [`CacheError::EmptyKey`] or [`CacheError::Store`].
    pub fn delete(&self, key: &str) -> CacheResult<bool> {
        let full_key = self.full_key(key)?;
        record_operation("delete");
        let deleted = Self::observe("delete", self.store.key_delete(&full_key))?;
        debug!("Deleted key '{}': {}", full_key, deleted);
        Ok(deleted)
    }

    /// Non-blocking [`CacheService::delete`].
    ///
    /// # Errors
    ///
    /// Same as [`CacheService::delete`].
    pub async fn delete_async(&self, key: &str) -> CacheResult<bool> {
        let full_key = self.full_key(key)?;
        record_operation("delete");
        let deleted = Self::observe("delete", self.store.key_delete_async(&full_key).await)?;
        debug!("Deleted key '{}': {}", full_key, deleted);
        Ok(deleted)
    }

    // ============ Internals ============

    /// Validates the key and TTL and encodes the payload; `None` for a null
    /// payload.
    fn prepare_add<T: Serialize + Any>(
        &self,
        key: &str,
        data: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<Option<(String, String)>> {
        let full_key = self.full_key(key)?;
        if ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(CacheError::invalid_argument("ttl must be greater than zero"));
        }
        match serialization::serialize_present(data, &self.settings)? {
            Some(value) => Ok(Some((full_key, value))),
            None => {
                debug!("Skipping null payload for key '{}'", full_key);
                Ok(None)
            }
        }
    }

    fn fetch<T: DeserializeOwned + Default + Any>(&self, key: &str) -> CacheResult<Option<T>> {
        let full_key = self.full_key(key)?;
        record_operation("get");
        let raw = Self::observe("get", self.store.string_get(&full_key))?;
        self.decode(&full_key, raw)
    }

    async fn fetch_async<T: DeserializeOwned + Default + Any>(&self, key: &str) -> CacheResult<Option<T>> {
        let full_key = self.full_key(key)?;
        record_operation("get");
        let raw = Self::observe("get", self.store.string_get_async(&full_key).await)?;
        self.decode(&full_key, raw)
    }

    /// `None` for an absent or empty value.
    fn decode<T: DeserializeOwned + Default + Any>(
        &self,
        full_key: &str,
        raw: Option<String>,
    ) -> CacheResult<Option<T>> {
        match raw.filter(|value| !value.is_empty()) {
            Some(value) => {
                debug!("Cache hit for key '{}'", full_key);
                record_lookup(true);
                serialization::deserialize::<T, String>(value, &self.settings).map(Some)
            }
            None => {
                debug!("Cache miss for key '{}'", full_key);
                record_lookup(false);
                Ok(None)
            }
        }
    }

    fn observe<R>(operation: &'static str, result: StoreResult<R>) -> CacheResult<R> {
        result.map_err(|err| {
            record_store_error(operation);
            CacheError::from(err)
        })
    }

    /// Turns a suppressible error into `fallback()` unless asked to propagate.
    fn recover<R>(
        &self,
        operation: &'static str,
        outcome: CacheResult<R>,
        propagate_on_failure: bool,
        fallback: impl FnOnce() -> R,
    ) -> CacheResult<R> {
        match outcome {
            Ok(value) => Ok(value),
            Err(err) if propagate_on_failure || !err.is_suppressible() => Err(err),
            Err(err) => {
                debug!("Suppressing {} failure: {}", operation, err);
                record_suppressed(operation, err.error_code());
                self.observer.on_suppressed_error(&err);
                Ok(fallback())
            }
        }
    }
}

fn found_or_default<T: Default>(found: Option<T>) -> (bool, T) {
    match found {
        Some(data) => (true, data),
        None => not_found(),
    }
}

fn not_found<T: Default>() -> (bool, T) {
    (false, T::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockStoreClient;
    use cachet_core::StoreError;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        #[serde(default)]
        email: Option<String>,
    }

    fn ann() -> User {
        User {
            name: "Ann".to_string(),
            email: None,
        }
    }

    fn service(store: MockStoreClient) -> CacheService<MockStoreClient> {
        CacheService::new(Arc::new(store))
    }

    fn counting_observer() -> (Arc<AtomicUsize>, impl ErrorObserver + 'static) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let observer = move |_: &CacheError| {
            counter.fetch_add(1, Ordering::SeqCst);
        };
        (calls, observer)
    }

    fn refused() -> StoreError {
        StoreError::Connection("connection refused".to_string())
    }

    /// A payload serde refuses to encode.
    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("unsupported payload"))
        }
    }

    // ============ Add ============

    #[test]
    fn test_add_empty_key_fails_without_store_call() {
        let cache = service(MockStoreClient::new());
        let err = cache.add("", &ann(), None).unwrap_err();
        assert!(err.is_empty_key());

        let err = cache.add("", &None::<User>, Some(Duration::from_secs(1))).unwrap_err();
        assert!(err.is_empty_key());
    }

    #[tokio::test]
    async fn test_add_async_empty_key_fails_without_store_call() {
        let cache = service(MockStoreClient::new());
        let err = cache.add_async("", &"value", None).await.unwrap_err();
        assert!(err.is_empty_key());
    }

    #[tokio::test]
    async fn test_add_null_data_returns_false_without_store_call() {
        let cache = service(MockStoreClient::new());
        assert!(!cache.add("k", &None::<User>, None).unwrap());
        assert!(!cache.add_async("k", &None::<User>, None).await.unwrap());
        assert!(!cache.try_add("k", &None::<User>, None, true).unwrap());
    }

    #[test]
    fn test_add_string_is_stored_verbatim() {
        for expected in [true, false] {
            let ttl = Duration::from_secs(30);
            let mut store = MockStoreClient::new();
            store
                .expect_string_set()
                .withf(move |key, value, t| key == "k" && value == "raw text" && *t == Some(ttl))
                .times(1)
                .returning(move |_, _, _| Ok(expected));

            let cache = service(store);
            assert_eq!(cache.add("k", &"raw text".to_string(), Some(ttl)).unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_add_async_object_is_serialized() {
        let mut store = MockStoreClient::new();
        store
            .expect_string_set_async()
            .withf(|key, value, ttl| key == "k" && value == r#"{"name":"Ann"}"# && ttl.is_none())
            .times(1)
            .returning(|_, _, _| Ok(true));

        let cache = service(store);
        assert!(cache.add_async("k", &ann(), None).await.unwrap());
    }

    #[test]
    fn test_add_store_error_propagates() {
        let mut store = MockStoreClient::new();
        store.expect_string_set().times(1).returning(|_, _, _| Err(refused()));

        let cache = service(store);
        let err = cache.add("k", &ann(), None).unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Connection(_))));
    }

    #[test]
    fn test_try_add_suppresses_store_error() {
        let mut store = MockStoreClient::new();
        store.expect_string_set().times(1).returning(|_, _, _| Err(refused()));

        let (calls, observer) = counting_observer();
        let cache = service(store).with_observer(observer);

        assert!(!cache.try_add("k", &ann(), None, false).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_try_add_async_propagates_when_asked() {
        let mut store = MockStoreClient::new();
        store.expect_string_set_async().times(1).returning(|_, _, _| Err(refused()));

        let (calls, observer) = counting_observer();
        let cache = service(store).with_observer(observer);

        let err = cache.try_add_async("k", &ann(), None, true).await.unwrap_err();
        assert_eq!(err.error_code(), "STORE_ERROR");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_try_add_empty_key_always_propagates() {
        let (calls, observer) = counting_observer();
        let cache = service(MockStoreClient::new()).with_observer(observer);

        for propagate in [true, false] {
            assert!(cache.try_add("", &ann(), None, propagate).unwrap_err().is_empty_key());
            assert!(cache
                .try_add_async("", &ann(), None, propagate)
                .await
                .unwrap_err()
                .is_empty_key());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_invalid_argument() {
        let cache = service(MockStoreClient::new());

        let err = cache.add("k", &"v", Some(Duration::ZERO)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        assert!(!err.is_empty_key());

        let err = cache
            .try_add_async("k", &"v", Some(Duration::ZERO), false)
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_try_add_propagates_store_error_when_asked() {
        let mut store = MockStoreClient::new();
        store.expect_string_set().times(1).returning(|_, _, _| Err(refused()));

        let (calls, observer) = counting_observer();
        let cache = service(store).with_observer(observer);

        let err = cache.try_add("k", &ann(), None, true).unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Connection(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_try_add_suppresses_serialization_error() {
        let seen: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let cache = service(MockStoreClient::new()).with_observer(move |error: &CacheError| {
            sink.lock().unwrap().push(error.error_code());
        });

        let err = cache.add("k", &Unencodable, None).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
        assert!(seen.lock().unwrap().is_empty());

        assert!(!cache.try_add("k", &Unencodable, None, false).unwrap());
        assert_eq!(*seen.lock().unwrap(), vec!["SERIALIZATION_ERROR"]);

        assert!(!cache.try_add_async("k", &Unencodable, None, false).await.unwrap());
        assert_eq!(seen.lock().unwrap().len(), 2);

        let err = cache.try_add("k", &Unencodable, None, true).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_map_with_none_values_roundtrips_through_store() {
        let stored = r#"{"a":null,"b":1}"#;
        let mut store = MockStoreClient::new();
        store
            .expect_string_set()
            .withf(move |key, value, _| key == "scores" && value == stored)
            .times(1)
            .returning(|_, _, _| Ok(true));
        store
            .expect_string_get()
            .times(1)
            .returning(move |_| Ok(Some(stored.to_string())));

        let mut scores = std::collections::BTreeMap::new();
        scores.insert("a".to_string(), None);
        scores.insert("b".to_string(), Some(1_u32));

        let cache = service(store);
        assert!(cache.add("scores", &scores, None).unwrap());
        assert_eq!(cache.get::<std::collections::BTreeMap<String, Option<u32>>>("scores").unwrap(), scores);
    }

    #[test]
    fn test_type_field_is_plain_data_by_default() {
        let mut store = MockStoreClient::new();
        store
            .expect_string_get()
            .times(1)
            .returning(|_| Ok(Some(r#"{"__type":"admin","name":"Ann"}"#.to_string())));

        let cache = service(store);
        let data: std::collections::BTreeMap<String, String> = cache.get("k").unwrap();
        assert_eq!(data.get("__type").map(String::as_str), Some("admin"));
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_try_add_without_observer_drops_error() {
        let mut store = MockStoreClient::new();
        store.expect_string_set().times(1).returning(|_, _, _| Err(StoreError::Disabled));

        let cache = service(store);
        assert!(!cache.try_add("k", &"v", None, false).unwrap());
    }

    // ============ Get ============

    #[tokio::test]
    async fn test_get_absent_returns_default() {
        let mut store = MockStoreClient::new();
        store.expect_string_get().times(1).returning(|_| Ok(None));
        store.expect_string_get_async().times(1).returning(|_| Ok(Some(String::new())));

        let cache = service(store);
        assert_eq!(cache.get::<User>("k").unwrap(), User::default());
        assert_eq!(cache.get_async::<User>("k").await.unwrap(), User::default());
    }

    #[tokio::test]
    async fn test_try_get_absent_is_not_found() {
        let mut store = MockStoreClient::new();
        store.expect_string_get().times(1).returning(|_| Ok(None));
        store.expect_string_get_async().times(1).returning(|_| Ok(None));

        let (calls, observer) = counting_observer();
        let cache = service(store).with_observer(observer);

        let (found, data) = cache.try_get::<User>("k", true).unwrap();
        assert!(!found);
        assert_eq!(data, User::default());

        let (found, data) = cache.try_get_async::<Option<User>>("k", false).await.unwrap();
        assert!(!found);
        assert!(data.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_get_string_is_identity() {
        let mut store = MockStoreClient::new();
        store
            .expect_string_get()
            .times(2)
            .returning(|_| Ok(Some("not json at all".to_string())));

        let cache = service(store);
        assert_eq!(cache.get::<String>("k").unwrap(), "not json at all");

        let (found, data) = cache.try_get::<String>("k", false).unwrap();
        assert!(found);
        assert_eq!(data, "not json at all");
    }

    #[test]
    fn test_get_object() {
        let mut store = MockStoreClient::new();
        store
            .expect_string_get()
            .withf(|key| key == "user:1")
            .times(1)
            .returning(|_| Ok(Some(r#"{"name":"Ann"}"#.to_string())));

        let cache = service(store);
        assert_eq!(cache.get::<User>("user:1").unwrap(), ann());
    }

    #[tokio::test]
    async fn test_get_malformed_text_is_decode_error() {
        let mut store = MockStoreClient::new();
        store
            .expect_string_get()
            .returning(|_| Ok(Some("{not json".to_string())));
        store
            .expect_string_get_async()
            .returning(|_| Ok(Some("{not json".to_string())));

        let (calls, observer) = counting_observer();
        let cache = service(store).with_observer(observer);

        assert_eq!(cache.get::<User>("x").unwrap_err().error_code(), "DECODE_ERROR");
        assert_eq!(cache.get_async::<User>("x").await.unwrap_err().error_code(), "DECODE_ERROR");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let (found, data) = cache.try_get::<User>("x", false).unwrap();
        assert!(!found);
        assert_eq!(data, User::default());

        let (found, _) = cache.try_get_async::<User>("x", false).await.unwrap();
        assert!(!found);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let err = cache.try_get::<User>("x", true).unwrap_err();
        assert!(matches!(err, CacheError::Decode(_)));
    }

    #[test]
    fn test_get_shape_mismatch_returns_default() {
        let mut store = MockStoreClient::new();
        store
            .expect_string_get()
            .times(2)
            .returning(|_| Ok(Some("\"plain string\"".to_string())));

        let cache = service(store);
        assert_eq!(cache.get::<User>("x").unwrap(), User::default());

        // The value was present, so it counts as found.
        let (found, data) = cache.try_get::<User>("x", false).unwrap();
        assert!(found);
        assert_eq!(data, User::default());
    }

    #[tokio::test]
    async fn test_try_get_store_error() {
        let mut store = MockStoreClient::new();
        store.expect_string_get().returning(|_| Err(refused()));
        store.expect_string_get_async().returning(|_| Err(refused()));

        let (calls, observer) = counting_observer();
        let cache = service(store).with_observer(observer);

        assert!(cache.get::<User>("k").is_err());

        let (found, data) = cache.try_get::<User>("k", false).unwrap();
        assert!(!found);
        assert_eq!(data, User::default());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let err = cache.try_get_async::<User>("k", true).await.unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_try_get_empty_key_always_propagates() {
        let cache = service(MockStoreClient::new());
        for propagate in [true, false] {
            assert!(cache.try_get::<User>("", propagate).unwrap_err().is_empty_key());
            assert!(cache
                .try_get_async::<User>("", propagate)
                .await
                .unwrap_err()
                .is_empty_key());
        }
    }

    // ============ Exists / Delete ============

    #[tokio::test]
    async fn test_exists_empty_key_fails_without_store_call() {
        let cache = service(MockStoreClient::new());
        assert!(cache.exists("").unwrap_err().is_empty_key());
        assert!(cache.exists_async("").await.unwrap_err().is_empty_key());
    }

    #[tokio::test]
    async fn test_exists_delegates() {
        for expected in [true, false] {
            let mut store = MockStoreClient::new();
            store.expect_key_exists().times(1).returning(move |_| Ok(expected));
            store.expect_key_exists_async().times(1).returning(move |_| Ok(expected));

            let cache = service(store);
            assert_eq!(cache.exists("k").unwrap(), expected);
            assert_eq!(cache.exists_async("k").await.unwrap(), expected);
        }
    }

    #[test]
    fn test_exists_store_error_propagates() {
        let mut store = MockStoreClient::new();
        store.expect_key_exists().times(1).returning(|_| Err(refused()));

        let (calls, observer) = counting_observer();
        let cache = service(store).with_observer(observer);
        assert!(cache.exists("k").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_delegates_and_propagates() {
        let mut store = MockStoreClient::new();
        store.expect_key_delete().times(1).returning(|_| Ok(true));
        store
            .expect_key_delete_async()
            .times(1)
            .returning(|key| Err(StoreError::command("DEL", key, "READONLY")));

        let cache = service(store);
        assert!(cache.delete("k").unwrap());
        assert!(cache.delete("").unwrap_err().is_empty_key());

        let err = cache.delete_async("k").await.unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Command { .. })));
    }

    // ============ Namespacing ============

    #[tokio::test]
    async fn test_prefix_applies_to_every_operation() {
        let mut store = MockStoreClient::new();
        store
            .expect_string_set()
            .withf(|key, _, _| key == "p:k")
            .times(1)
            .returning(|_, _, _| Ok(true));
        store
            .expect_string_get()
            .withf(|key| key == "p:k")
            .times(1)
            .returning(|_| Ok(Some("v".to_string())));
        store
            .expect_key_exists()
            .withf(|key| key == "p:k")
            .times(1)
            .returning(|_| Ok(true));
        store
            .expect_key_delete()
            .withf(|key| key == "p:k")
            .times(1)
            .returning(|_| Ok(true));
        store
            .expect_string_set_async()
            .withf(|key, _, _| key == "p:k")
            .times(1)
            .returning(|_, _, _| Ok(true));
        store
            .expect_string_get_async()
            .withf(|key| key == "p:k")
            .times(1)
            .returning(|_| Ok(None));
        store
            .expect_key_exists_async()
            .withf(|key| key == "p:k")
            .times(1)
            .returning(|_| Ok(false));
        store
            .expect_key_delete_async()
            .withf(|key| key == "p:k")
            .times(1)
            .returning(|_| Ok(false));

        let cache = service(store).with_prefix("p:");
        assert_eq!(cache.full_key("k").unwrap(), "p:k");

        assert!(cache.add("k", &"v", None).unwrap());
        assert_eq!(cache.get::<String>("k").unwrap(), "v");
        assert!(cache.exists("k").unwrap());
        assert!(cache.delete("k").unwrap());

        assert!(cache.add_async("k", &"v", None).await.unwrap());
        assert_eq!(cache.get_async::<String>("k").await.unwrap(), "");
        assert!(!cache.exists_async("k").await.unwrap());
        assert!(!cache.delete_async("k").await.unwrap());
    }

    #[test]
    fn test_user_scenario_with_app_prefix() {
        let mut store = MockStoreClient::new();
        store
            .expect_string_set()
            .withf(|key, value, _| key == "app:user:1" && value == r#"{"name":"Ann"}"#)
            .times(1)
            .returning(|_, _, _| Ok(true));
        store
            .expect_string_get()
            .withf(|key| key == "app:user:1")
            .times(1)
            .returning(|_| Ok(Some(r#"{"name":"Ann"}"#.to_string())));

        let mut config = AppConfig::default();
        config.cache.key_prefix = Some("app:".to_string());
        let cache = CacheService::from_config(Arc::new(store), &config);

        assert!(cache.add("user:1", &ann(), None).unwrap());
        assert_eq!(cache.get::<User>("user:1").unwrap(), ann());
    }

    #[test]
    fn test_service_is_shareable_as_trait_object() {
        let store: Arc<dyn StoreClient> = Arc::new(MockStoreClient::new());
        let cache: CacheService = CacheService::new(store).with_prefix("p:");
        let copy = cache.clone();
        assert_eq!(copy.prefix().as_str(), "p:");
        assert!(copy.settings().omit_null_fields);
    }
}
