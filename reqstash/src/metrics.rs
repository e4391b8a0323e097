//! Metrics declaration and recording.
//!
//! All counters carry a `backend` label naming the store involved.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

use crate::entry::Invalidation;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of requests served from the cache.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "reqstash_cache_hit_total",
            "Total number of requests served from the cache."
        );
        "reqstash_cache_hit_total"
    };
    /// Track number of cacheable requests that went to the network.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "reqstash_cache_miss_total",
            "Total number of cacheable requests not found in the cache."
        );
        "reqstash_cache_miss_total"
    };
    /// Track number of responses written into a store.
    pub static ref CACHE_WRITE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "reqstash_cache_write_total",
            "Total number of responses written to the cache."
        );
        "reqstash_cache_write_total"
    };
    /// Track number of failed cache writes.
    pub static ref CACHE_WRITE_ERRORS: &'static str = {
        metrics::describe_counter!(
            "reqstash_cache_write_errors_total",
            "Total number of failed cache writes."
        );
        "reqstash_cache_write_errors_total"
    };
    /// Track number of invalidated entries, labeled by reason.
    pub static ref CACHE_INVALIDATION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "reqstash_cache_invalidation_total",
            "Total number of cache entries removed before reuse."
        );
        "reqstash_cache_invalidation_total"
    };
}

/// Record a cache hit.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_hit(backend: &str) {
    metrics::counter!(*CACHE_HIT_COUNTER, "backend" => backend.to_string()).increment(1);
}

/// Record a cache hit (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_hit(_backend: &str) {}

/// Record a cache miss.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_miss(backend: &str) {
    metrics::counter!(*CACHE_MISS_COUNTER, "backend" => backend.to_string()).increment(1);
}

/// Record a cache miss (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_miss(_backend: &str) {}

/// Record a completed cache write.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_write(backend: &str) {
    metrics::counter!(*CACHE_WRITE_COUNTER, "backend" => backend.to_string()).increment(1);
}

/// Record a completed cache write (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_write(_backend: &str) {}

/// Record a failed cache write.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_write_error(backend: &str) {
    metrics::counter!(*CACHE_WRITE_ERRORS, "backend" => backend.to_string()).increment(1);
}

/// Record a failed cache write (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_write_error(_backend: &str) {}

/// Record an invalidation.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_invalidation(backend: &str, reason: Invalidation) {
    metrics::counter!(
        *CACHE_INVALIDATION_COUNTER,
        "backend" => backend.to_string(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record an invalidation (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_invalidation(_backend: &str, _reason: Invalidation) {}
