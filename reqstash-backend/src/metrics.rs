//! Storage capacity metrics.
//!
//! Enable the `metrics` feature to use these metrics.
//!
//! ## Metrics
//!
//! - `reqstash_storage_entries` - Current number of entries in the store (gauge)
//! - `reqstash_storage_size_bytes` - Current size of keys and values in bytes (gauge)
//!
//! Both metrics include a `backend` label to distinguish between stores.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for the entry count gauge.
    pub static ref STORAGE_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "reqstash_storage_entries",
            "Current number of entries in the store."
        );
        "reqstash_storage_entries"
    };

    /// Metric name for the size gauge.
    pub static ref STORAGE_SIZE_BYTES: &'static str = {
        metrics::describe_gauge!(
            "reqstash_storage_size_bytes",
            "Current size of stored keys and values in bytes."
        );
        "reqstash_storage_size_bytes"
    };
}

/// Record current store capacity.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_capacity(backend: &str, entries: u64, size_bytes: u64) {
    metrics::gauge!(*STORAGE_ENTRIES, "backend" => backend.to_string()).set(entries as f64);
    metrics::gauge!(*STORAGE_SIZE_BYTES, "backend" => backend.to_string()).set(size_bytes as f64);
}

/// Record current store capacity (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_capacity(_backend: &str, _entries: u64, _size_bytes: u64) {}
