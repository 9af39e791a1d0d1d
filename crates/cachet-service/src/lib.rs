//! # Cachet Service
//!
//! Cache façade placed in front of a remote key-value store.
//!
//! Every operation validates its key, prepends the configured namespace,
//! converts the payload through [`serialization`] and issues exactly one
//! request to a [`StoreClient`]. Strict operations return every failure;
//! `try_*` operations turn store and decode failures into `false` and report
//! them to an [`ErrorObserver`].

mod cache_service;
pub mod di;
pub mod metrics;
mod observer;
pub mod serialization;
pub mod store;

pub use cache_service::CacheService;
pub use observer::{ErrorObserver, NoopObserver, TracingObserver};
pub use store::{RedisStore, RedisStoreParameters, StoreClient};
