#![doc = include_str!("../README.md")]

mod middleware;
mod upstream;

pub use middleware::{DEFAULT_CACHE_STATUS_HEADER, LocalCacheMiddleware};
pub use upstream::describe_request;

// Re-export common types
pub use reqstash::{CacheSettings, LocalCache};
pub use reqstash_core::{CacheOptions, DataType};
