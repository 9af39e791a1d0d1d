//! Cache metrics recorded through the `metrics` facade.
//!
//! Nothing is exported unless the host installs a recorder.

use metrics::{counter, describe_counter};

/// Metric names for the cache façade.
pub mod names {
    /// Store round trips issued, by operation.
    pub const OPERATIONS_TOTAL: &str = "cachet_operations_total";
    /// Reads that found a value.
    pub const HITS_TOTAL: &str = "cachet_hits_total";
    /// Reads that found nothing.
    pub const MISSES_TOTAL: &str = "cachet_misses_total";
    /// Store calls that failed, by operation.
    pub const STORE_ERRORS_TOTAL: &str = "cachet_store_errors_total";
    /// Errors turned into `false` by a `try_*` operation.
    pub const SUPPRESSED_ERRORS_TOTAL: &str = "cachet_suppressed_errors_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::OPERATIONS_TOTAL, "Store round trips issued by the cache");
    describe_counter!(names::HITS_TOTAL, "Cache reads that found a value");
    describe_counter!(names::MISSES_TOTAL, "Cache reads that found nothing");
    describe_counter!(names::STORE_ERRORS_TOTAL, "Store calls that failed");
    describe_counter!(
        names::SUPPRESSED_ERRORS_TOTAL,
        "Errors suppressed by try operations"
    );
}

/// Record a store round trip.
pub fn record_operation(operation: &'static str) {
    counter!(names::OPERATIONS_TOTAL, "op" => operation).increment(1);
}

/// Record a read outcome.
pub fn record_lookup(hit: bool) {
    if hit {
        counter!(names::HITS_TOTAL).increment(1);
    } else {
        counter!(names::MISSES_TOTAL).increment(1);
    }
}

/// Record a failed store call.
pub fn record_store_error(operation: &'static str) {
    counter!(names::STORE_ERRORS_TOTAL, "op" => operation).increment(1);
}

/// Record a suppressed error.
pub fn record_suppressed(operation: &'static str, code: &'static str) {
    counter!(names::SUPPRESSED_ERRORS_TOTAL, "op" => operation, "code" => code).increment(1);
}
