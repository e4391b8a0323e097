//! Pre-dispatch half of the pipeline.
//!
//! The prefilter decides whether caching applies to a request, clears stale
//! or rejected entries, and when nothing usable is cached wraps the request's
//! success handler so a successful response is written back.

use std::sync::Arc;

use reqstash_core::expiry::{expire_at, is_expired};
use reqstash_core::{CacheKey, Prefilter, RequestDescriptor, is_valid_storage};

use crate::config::CacheSettings;
use crate::decorator::wrap_success;
use crate::entry::{CacheEntry, Invalidation};

/// What the prefilter did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefilterDecision {
    /// The request did not opt into caching.
    PassThrough,
    /// Caching was requested but the selected store is unusable.
    InvalidStorage,
    /// A usable entry exists; the success handler was left untouched.
    Fresh {
        /// Key of the entry.
        key: CacheKey,
    },
    /// Nothing usable is cached; the success handler now writes the response.
    Populate {
        /// Key the response will be written under.
        key: CacheKey,
        /// Expiry record to write with it, `None` when one is already recorded.
        expire: Option<i64>,
    },
}

/// Request prefilter.
///
/// Holds nothing but the shared settings, so it can be cloned freely and
/// registered on any number of dispatchers.
#[derive(Debug, Clone)]
pub struct CachePrefilter {
    settings: Arc<CacheSettings>,
}

impl CachePrefilter {
    /// Creates a prefilter over `settings`.
    pub fn new(settings: Arc<CacheSettings>) -> Self {
        Self { settings }
    }

    /// Runs the prefilter and reports the decision taken.
    pub fn apply(&self, request: &mut RequestDescriptor) -> PrefilterDecision {
        let Some(options) = request.cache_options().cloned() else {
            return PrefilterDecision::PassThrough;
        };

        let storage = match self.settings.resolve_storage(&options.storage) {
            Some(storage) if is_valid_storage(Some(storage.as_ref())) => storage,
            _ => {
                tracing::warn!(url = %request.url, storage = ?options.storage, "caching requested but storage is unusable, skipping cache");
                return PrefilterDecision::InvalidStorage;
            }
        };

        let key = self.settings.derive_key(request);
        let suffix = self.settings.ttl_suffix(&options);
        let entry = CacheEntry::new(storage, key.clone(), suffix);

        if let Some(is_cache_valid) = &options.is_cache_valid
            && !is_cache_valid()
        {
            entry.invalidate(Invalidation::Rejected);
        }

        let now = self.settings.now_millis();
        let mut recorded = entry.expiry();
        if is_expired(recorded, now) {
            entry.invalidate(Invalidation::Expired);
            recorded = 0;
        }

        if entry.read().is_some() {
            tracing::debug!(%key, expire = recorded, "cached entry is fresh");
            return PrefilterDecision::Fresh { key };
        }

        let expire = (recorded == 0).then(|| expire_at(now, self.settings.ttl_minutes(&options)));
        let data_type = request.data_type;
        let original = request.success.take();
        request.success = Some(wrap_success(original, move |data| {
            entry.store(data, data_type, expire);
        }));

        tracing::debug!(%key, suffix, expire, "no cached entry, response will be stored");
        PrefilterDecision::Populate { key, expire }
    }
}

impl Prefilter for CachePrefilter {
    fn prefilter(&self, request: &mut RequestDescriptor) {
        self.apply(request);
    }
}
