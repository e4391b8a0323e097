//! Expiry record bookkeeping.
//!
//! Every cache entry stored under `<key>` may be accompanied by an expiry
//! record stored under `<key><suffix>`. The record holds the absolute expiry
//! time as decimal epoch milliseconds. Time is read through the [`Clock`]
//! trait so TTL behavior can be tested without sleeping.
//!
//! ```
//! use reqstash_core::expiry::{effective_ttl_minutes, expire_at, parse_expiry};
//!
//! let ttl = effective_ttl_minutes(Some(5.0), 60.0);
//! assert_eq!(expire_at(1_000, ttl), 301_000);
//!
//! // Missing or garbled records mean "no recorded expiry".
//! assert_eq!(parse_expiry(Some("not a number")), 0);
//! assert_eq!(parse_expiry(None), 0);
//! ```

use std::fmt;

/// Suffix appended to a cache key to form its expiry record key.
pub const DEFAULT_TTL_SUFFIX: &str = "_cachettl";

/// TTL applied when a request carries no valid override.
pub const DEFAULT_TTL_MINUTES: f64 = 60.0;

/// Milliseconds per minute.
pub const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Returns the TTL override when it is a positive finite number, else `default`.
pub fn effective_ttl_minutes(ttl_override: Option<f64>, default: f64) -> f64 {
    match ttl_override {
        Some(minutes) if minutes.is_finite() && minutes > 0.0 => minutes,
        _ => default,
    }
}

/// Absolute expiry for an entry written at `now` with `ttl_minutes`.
pub fn expire_at(now: i64, ttl_minutes: f64) -> i64 {
    now.saturating_add((ttl_minutes * MILLIS_PER_MINUTE).round() as i64)
}

/// Parses a stored expiry record; missing or non-numeric records yield `0`.
pub fn parse_expiry(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Whether a recorded expiry has passed.
///
/// `0` means nothing is recorded and is never expired. Any other value,
/// negative ones included, is compared against `now`.
pub fn is_expired(recorded: i64, now: i64) -> bool {
    recorded != 0 && recorded < now
}

/// Returns the suffix override when non-blank, else `default`.
pub fn ttl_suffix<'a>(suffix_override: Option<&'a str>, default: &'a str) -> &'a str {
    suffix_override
        .filter(|suffix| !suffix.trim().is_empty())
        .unwrap_or(default)
}

/// Key of the expiry record accompanying `key`.
pub fn record_key(key: impl fmt::Display, suffix: &str) -> String {
    format!("{key}{suffix}")
}

#[cfg(any(test, feature = "test-helpers"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-helpers"))]
mod manual {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    use super::Clock;

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time.
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock {
        now: Arc<AtomicI64>,
    }

    impl ManualClock {
        /// Creates a clock reading `now_millis`.
        pub fn new(now_millis: i64) -> Self {
            Self {
                now: Arc::new(AtomicI64::new(now_millis)),
            }
        }

        /// Sets the current time.
        pub fn set(&self, now_millis: i64) {
            self.now.store(now_millis, Ordering::SeqCst);
        }

        /// Moves the clock forward.
        pub fn advance(&self, by: Duration) {
            self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
