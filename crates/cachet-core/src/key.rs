//! Cache key validation and namespacing.

use crate::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validates a logical key.
///
/// A key is invalid only when it is empty; whitespace-only keys are accepted
/// and passed to the store untouched.
///
/// # Errors
///
/// Returns [`CacheError::EmptyKey`] for an empty key.
pub fn validate_key(key: &str) -> CacheResult<&str> {
    if key.is_empty() {
        return Err(CacheError::empty_key());
    }
    Ok(key)
}

/// Namespace prefix prepended to every logical key.
///
/// The full key is the plain concatenation `prefix + key`; no separator is
/// inserted, so callers who want `app:user:1` configure the prefix `app:`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Creates a prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Creates an empty prefix (no namespacing).
    #[must_use]
    pub const fn none() -> Self {
        Self(String::new())
    }

    /// Returns the prefix text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if no namespacing is applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds the full key for a logical key.
    #[must_use]
    pub fn apply(&self, key: &str) -> String {
        let mut full = String::with_capacity(self.0.len() + key.len());
        full.push_str(&self.0);
        full.push_str(key);
        full
    }
}

impl From<String> for KeyPrefix {
    fn from(prefix: String) -> Self {
        Self(prefix)
    }
}

impl From<&str> for KeyPrefix {
    fn from(prefix: &str) -> Self {
        Self(prefix.to_string())
    }
}

impl From<Option<String>> for KeyPrefix {
    fn from(prefix: Option<String>) -> Self {
        prefix.map_or_else(Self::none, Self)
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
