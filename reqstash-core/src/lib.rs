#![warn(missing_docs)]
//! # reqstash-core
//!
//! Core traits and types for the reqstash request-caching interceptor.
//!
//! This crate holds everything the caching pipeline shares but does not
//! decide on its own:
//!
//! - **Derive** cache keys from request descriptors ([`KeyDeriver`])
//! - **Validate** caller-supplied stores ([`is_valid_storage`])
//! - **Track** expiry records ([`expiry`])
//! - **Describe** requests and responses ([`RequestDescriptor`], [`ResponseData`])
//! - **Hook** into a request-execution framework ([`Prefilter`], [`TransportFactory`], [`Transport`])
//! - **Call** the network when nothing is cached ([`Upstream`])
//!
//! The decision logic itself lives in the `reqstash` crate; storage
//! implementations live in `reqstash-backend`.
//!
//! ## Feature Flags
//!
//! - `test-helpers` - Expose [`expiry::ManualClock`] for deterministic TTL tests
//!

pub mod expiry;
pub mod hook;
pub mod key;
pub mod request;
pub mod response;
pub mod storage;
pub mod upstream;

pub use expiry::{Clock, SystemClock};
pub use hook::{Prefilter, Transport, TransportFactory};
pub use key::{CALLBACK_MARKER, CacheKey, KeyDeriver, normalize_url};
pub use request::{
    CacheOptions, DataType, Payload, RequestDescriptor, StorageSelector, SuccessHandler,
    ValidityPredicate,
};
pub use response::{CompleteCallback, Completion, ResponseData, ResponseMap};
pub use storage::{Storage, StorageError, StorageOp, StorageResult, is_valid_storage};
pub use upstream::{Upstream, UpstreamError, UpstreamResponse};
#[doc(hidden)]
pub use smol_str::SmolStr;
