//! Pipeline settings.
//!
//! `CacheSettings` holds the immutable, process-wide inputs of the pipeline:
//! the default durable store, default TTL and expiry-record suffix, the key
//! deriver and the clock. The prefilter and the transport each hold a shared
//! reference to the same settings and nothing else.

use std::fmt;
use std::sync::Arc;

use reqstash_core::expiry::{self, DEFAULT_TTL_MINUTES, DEFAULT_TTL_SUFFIX};
use reqstash_core::{
    CacheKey, CacheOptions, Clock, KeyDeriver, RequestDescriptor, Storage, StorageSelector,
    SystemClock,
};
use smol_str::SmolStr;

/// Immutable pipeline settings.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use reqstash::CacheSettings;
/// use reqstash_backend::MemoryStorage;
///
/// let settings = CacheSettings::builder()
///     .default_storage(Arc::new(MemoryStorage::new()))
///     .default_ttl_minutes(10.0)
///     .build();
///
/// assert_eq!(settings.default_ttl_minutes(), 10.0);
/// assert_eq!(settings.default_ttl_suffix(), "_cachettl");
/// ```
#[derive(Clone)]
pub struct CacheSettings {
    default_storage: Option<Arc<dyn Storage>>,
    default_ttl_minutes: f64,
    default_ttl_suffix: SmolStr,
    key_deriver: KeyDeriver,
    clock: Arc<dyn Clock>,
}

impl CacheSettings {
    /// Starts building settings.
    pub fn builder() -> CacheSettingsBuilder {
        CacheSettingsBuilder::default()
    }

    /// Store used by requests selecting [`StorageSelector::Default`].
    pub fn default_storage(&self) -> Option<&Arc<dyn Storage>> {
        self.default_storage.as_ref()
    }

    /// TTL applied when a request has no valid override.
    pub fn default_ttl_minutes(&self) -> f64 {
        self.default_ttl_minutes
    }

    /// Expiry-record suffix applied when a request has no override.
    pub fn default_ttl_suffix(&self) -> &str {
        &self.default_ttl_suffix
    }

    /// Key deriver shared by both hooks.
    pub fn key_deriver(&self) -> &KeyDeriver {
        &self.key_deriver
    }

    /// Current time in epoch milliseconds.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Resolves the store a request selected.
    ///
    /// `None` for disabled requests and for `Default` when no default store
    /// is configured.
    pub fn resolve_storage(&self, selector: &StorageSelector) -> Option<Arc<dyn Storage>> {
        match selector {
            StorageSelector::Disabled => None,
            StorageSelector::Default => self.default_storage.clone(),
            StorageSelector::Custom(storage) => Some(Arc::clone(storage)),
        }
    }

    /// Derives the cache key of `request`.
    pub fn derive_key(&self, request: &RequestDescriptor) -> CacheKey {
        self.key_deriver.derive(request)
    }

    /// Expiry-record suffix for a request.
    pub fn ttl_suffix<'a>(&'a self, options: &'a CacheOptions) -> &'a str {
        expiry::ttl_suffix(options.ttl_suffix.as_deref(), &self.default_ttl_suffix)
    }

    /// TTL in minutes for a request.
    pub fn ttl_minutes(&self, options: &CacheOptions) -> f64 {
        expiry::effective_ttl_minutes(options.ttl_minutes, self.default_ttl_minutes)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettingsBuilder::default().build()
    }
}

impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field(
                "default_storage",
                &self.default_storage.as_ref().map(|storage| storage.name()),
            )
            .field("default_ttl_minutes", &self.default_ttl_minutes)
            .field("default_ttl_suffix", &self.default_ttl_suffix)
            .field("key_deriver", &self.key_deriver)
            .finish()
    }
}

/// Builder for [`CacheSettings`].
///
/// Use [`CacheSettings::builder()`] to create a new builder.
pub struct CacheSettingsBuilder {
    default_storage: Option<Arc<dyn Storage>>,
    default_ttl_minutes: f64,
    default_ttl_suffix: SmolStr,
    key_deriver: KeyDeriver,
    clock: Arc<dyn Clock>,
}

impl Default for CacheSettingsBuilder {
    fn default() -> Self {
        Self {
            default_storage: None,
            default_ttl_minutes: DEFAULT_TTL_MINUTES,
            default_ttl_suffix: SmolStr::new_static(DEFAULT_TTL_SUFFIX),
            key_deriver: KeyDeriver::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl CacheSettingsBuilder {
    /// Sets the default durable store.
    pub fn default_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.default_storage = Some(storage);
        self
    }

    /// Sets the default TTL; non-positive values keep the built-in default.
    pub fn default_ttl_minutes(mut self, minutes: f64) -> Self {
        self.default_ttl_minutes = expiry::effective_ttl_minutes(Some(minutes), DEFAULT_TTL_MINUTES);
        self
    }

    /// Sets the default expiry-record suffix; blank values are ignored.
    pub fn default_ttl_suffix(mut self, suffix: impl Into<SmolStr>) -> Self {
        let suffix = suffix.into();
        if !suffix.trim().is_empty() {
            self.default_ttl_suffix = suffix;
        }
        self
    }

    /// Sets the key deriver.
    pub fn key_deriver(mut self, deriver: KeyDeriver) -> Self {
        self.key_deriver = deriver;
        self
    }

    /// Sets the clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the settings.
    pub fn build(self) -> CacheSettings {
        CacheSettings {
            default_storage: self.default_storage,
            default_ttl_minutes: self.default_ttl_minutes,
            default_ttl_suffix: self.default_ttl_suffix,
            key_deriver: self.key_deriver,
            clock: self.clock,
        }
    }
}

#[cfg(test)]
mod tests {
    use reqstash_backend::MemoryStorage;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CacheSettings::default();
        assert!(settings.default_storage().is_none());
        assert_eq!(settings.default_ttl_minutes(), 60.0);
        assert_eq!(settings.default_ttl_suffix(), "_cachettl");
    }

    #[test]
    fn test_resolve_storage() {
        let default: Arc<dyn Storage> = Arc::new(MemoryStorage::new().label("default"));
        let custom: Arc<dyn Storage> = Arc::new(MemoryStorage::new().label("custom"));
        let settings = CacheSettings::builder()
            .default_storage(Arc::clone(&default))
            .build();

        assert!(settings.resolve_storage(&StorageSelector::Disabled).is_none());
        assert_eq!(
            settings
                .resolve_storage(&StorageSelector::Default)
                .map(|s| s.name().to_string()),
            Some("default".to_string())
        );
        assert_eq!(
            settings
                .resolve_storage(&StorageSelector::Custom(custom))
                .map(|s| s.name().to_string()),
            Some("custom".to_string())
        );
    }

    #[test]
    fn test_default_store_missing() {
        let settings = CacheSettings::default();
        assert!(settings.resolve_storage(&StorageSelector::Default).is_none());
    }

    #[test]
    fn test_per_request_overrides() {
        let settings = CacheSettings::builder().default_ttl_suffix("_exp").build();
        let options = CacheOptions::default_store().ttl_minutes(-1.0);
        assert_eq!(settings.ttl_minutes(&options), 60.0);
        assert_eq!(settings.ttl_suffix(&options), "_exp");

        let options = CacheOptions::default_store()
            .ttl_minutes(5.0)
            .ttl_suffix("_ttl");
        assert_eq!(settings.ttl_minutes(&options), 5.0);
        assert_eq!(settings.ttl_suffix(&options), "_ttl");
    }

    #[test]
    fn test_builder_ignores_invalid_defaults() {
        let settings = CacheSettings::builder()
            .default_ttl_minutes(0.0)
            .default_ttl_suffix(" ")
            .build();
        assert_eq!(settings.default_ttl_minutes(), 60.0);
        assert_eq!(settings.default_ttl_suffix(), "_cachettl");
    }
}
