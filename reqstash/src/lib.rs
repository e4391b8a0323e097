#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod cache;

/// Pipeline settings.
///
/// Provides [`CacheSettings`](config::CacheSettings), built once and shared
/// by both hooks: default store, default TTL and suffix, key deriver, clock.
pub mod config;

mod decorator;

/// Synchronous request-execution framework.
///
/// [`Dispatcher`](dispatcher::Dispatcher) exposes the prefilter and
/// transport hook points and falls back to an
/// [`Upstream`](reqstash_core::Upstream) when no transport claims a request.
pub mod dispatcher;

/// Cache entry access and invalidation reasons.
pub mod entry;

/// Error types for dispatching.
pub mod error;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// for:
/// - Cache hits and misses
/// - Cache writes and write failures
/// - Invalidations by reason
pub mod metrics;

/// Request prefilter.
pub mod prefilter;

/// Transport interceptor.
pub mod transport;

pub use cache::LocalCache;
pub use config::{CacheSettings, CacheSettingsBuilder};
pub use decorator::wrap_success;
pub use dispatcher::{DataTypePattern, Dispatcher, Outcome, ResponseSource};
pub use entry::Invalidation;
pub use error::DispatchError;
pub use prefilter::{CachePrefilter, PrefilterDecision};
pub use transport::{CacheTransport, CachedTransport};

pub use reqstash_core::{
    CacheKey, CacheOptions, Clock, DataType, KeyDeriver, Payload, RequestDescriptor, ResponseData,
    Storage, StorageError, StorageSelector, SystemClock, Upstream, UpstreamError,
    UpstreamResponse,
};
