//! YAML configuration for reqstash.
//!
//! Deserialize a [`ConfigCache`] with `serde-saphyr` (or any serde format),
//! then turn it into [`CacheSettings`](reqstash::CacheSettings) or a
//! [`LocalCache`](reqstash::LocalCache):
//!
//! ```
//! use reqstash_configuration::ConfigCache;
//!
//! let cache = ConfigCache::from_yaml(
//!     r#"
//! storage:
//!   type: Memory
//!   max_bytes: 1 MiB
//! ttl_minutes: 10
//! "#,
//! )?
//! .into_cache()?;
//!
//! assert_eq!(cache.settings().default_ttl_minutes(), 10.0);
//! # Ok::<(), reqstash_configuration::ConfigError>(())
//! ```

mod cache;
mod error;
pub mod storage;

pub use cache::ConfigCache;
pub use error::ConfigError;
pub use storage::StorageConfig;
