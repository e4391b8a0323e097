use reqstash::{CacheSettings, LocalCache};
use reqstash_core::KeyDeriver;
use reqstash_core::expiry::{DEFAULT_TTL_MINUTES, DEFAULT_TTL_SUFFIX};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage::StorageConfig;

fn default_ttl_minutes() -> f64 {
    DEFAULT_TTL_MINUTES
}

fn default_ttl_suffix() -> String {
    DEFAULT_TTL_SUFFIX.to_string()
}

/// Declarative cache configuration.
///
/// ```yaml
/// storage:
///   type: File
///   path: /var/cache/myapp
///   max_bytes: 5 MiB
/// ttl_minutes: 30
/// ttl_suffix: _cachettl
/// key_separator: ""
/// ```
///
/// Every field is optional. Without `storage` only requests that bring
/// their own store are cached.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ConfigCache {
    /// Default durable store.
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    /// TTL applied when a request has no override.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: f64,
    /// Suffix of expiry record keys.
    #[serde(default = "default_ttl_suffix")]
    pub ttl_suffix: String,
    /// Separator between url and method in derived keys.
    #[serde(default)]
    pub key_separator: String,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self {
            storage: None,
            ttl_minutes: default_ttl_minutes(),
            ttl_suffix: default_ttl_suffix(),
            key_separator: String::new(),
        }
    }
}

impl ConfigCache {
    /// Parses a YAML document.
    pub fn from_yaml(document: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(document).map_err(|err| ConfigError::Parse(Box::new(err)))
    }

    /// Checks values the builder would otherwise silently replace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ttl_minutes.is_finite() && self.ttl_minutes > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "ttl_minutes",
                reason: format!("expected a positive number of minutes, got {}", self.ttl_minutes),
            });
        }
        if self.ttl_suffix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ttl_suffix",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// Validates the configuration and opens its store.
    pub fn into_settings(self) -> Result<CacheSettings, ConfigError> {
        self.validate()?;

        let mut builder = CacheSettings::builder()
            .default_ttl_minutes(self.ttl_minutes)
            .default_ttl_suffix(self.ttl_suffix.as_str())
            .key_deriver(KeyDeriver::with_separator(self.key_separator.as_str()));

        if let Some(storage) = self.storage {
            let storage = storage.into_storage()?;
            tracing::debug!(backend = storage.name(), "default storage configured");
            builder = builder.default_storage(storage);
        }

        Ok(builder.build())
    }

    /// Builds a ready-to-install cache.
    pub fn into_cache(self) -> Result<LocalCache, ConfigError> {
        self.into_settings().map(LocalCache::new)
    }
}
