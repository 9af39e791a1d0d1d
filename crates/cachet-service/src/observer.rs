//! Reporting of errors suppressed by the `try_*` operations.

use cachet_core::CacheError;
use tracing::warn;

/// Receives every error a `try_*` operation turns into `false`.
///
/// Called exactly once per suppressed error, before the operation returns.
/// It cannot change the outcome.
pub trait ErrorObserver: Send + Sync {
    /// Called with the suppressed error.
    fn on_suppressed_error(&self, error: &CacheError);
}

/// Drops suppressed errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ErrorObserver for NoopObserver {
    fn on_suppressed_error(&self, _error: &CacheError) {}
}

/// Logs suppressed errors at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ErrorObserver for TracingObserver {
    fn on_suppressed_error(&self, error: &CacheError) {
        warn!(
            code = error.error_code(),
            retriable = error.is_retriable(),
            "Suppressed cache error: {}",
            error
        );
    }
}

impl<F> ErrorObserver for F
where
    F: Fn(&CacheError) + Send + Sync,
{
    fn on_suppressed_error(&self, error: &CacheError) {
        self(error);
    }
}
