//! Result type aliases for Cachet.

use crate::{CacheError, StoreError};

/// A specialized `Result` type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// A specialized `Result` type for store client calls.
pub type StoreResult<T> = Result<T, StoreError>;
