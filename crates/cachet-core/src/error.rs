//! Error types shared by every Cachet crate.

use thiserror::Error;

/// Unified error type for cache operations.
///
/// Variants fall into two classes:
/// - invalid-argument errors (`EmptyKey`, `InvalidArgument`), which signal a
///   broken caller contract and are never suppressed by the `try_*` operations;
/// - data and store errors (`Decode`, `Serialization`, `Store`), which the
///   `try_*` operations turn into a `false` outcome unless asked to propagate.
#[derive(Error, Debug)]
pub enum CacheError {
    // ============ Argument Errors ============
    /// The logical key was empty.
    #[error("The key should be specified (parameter '{param}')")]
    EmptyKey { param: &'static str },

    /// Any other invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ============ Data Errors ============
    /// The stored text is not well-formed JSON.
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// The value could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    // ============ Infrastructure Errors ============
    /// The underlying key-value store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Creates the error raised for an empty `key` argument.
    #[must_use]
    pub const fn empty_key() -> Self {
        Self::EmptyKey { param: "key" }
    }

    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid_argument<T: Into<String>>(message: T) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyKey { .. } => "EMPTY_KEY",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Checks if this error is an invalid-argument error.
    ///
    /// `EmptyKey` is a specialization of the invalid-argument class.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::EmptyKey { .. } | Self::InvalidArgument(_))
    }

    /// Checks if this error is the empty-key error.
    #[must_use]
    pub const fn is_empty_key(&self) -> bool {
        matches!(self, Self::EmptyKey { .. })
    }

    /// Checks if a `try_*` operation may turn this error into `false`.
    #[must_use]
    pub const fn is_suppressible(&self) -> bool {
        !self.is_invalid_argument()
    }

    /// Checks if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Errors raised by a key-value store client.
///
/// The façade treats these as opaque; it only distinguishes them from
/// argument and data errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not reach the store.
    #[error("Store connection error: {0}")]
    Connection(String),

    /// Could not obtain a pooled connection.
    #[error("Store pool error: {0}")]
    Pool(String),

    /// A command reached the store and failed.
    #[error("Store command {command} failed for key '{key}': {message}")]
    Command {
        command: &'static str,
        key: String,
        message: String,
    },

    /// The store client was built without a backend.
    #[error("Store is disabled")]
    Disabled,
}

impl StoreError {
    /// Creates a command error.
    #[must_use]
    pub fn command<K: Into<String>, M: ToString>(command: &'static str, key: K, message: M) -> Self {
        Self::Command {
            command,
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Checks if retrying the same request might succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Pool(_))
    }
}
