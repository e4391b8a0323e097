//! Transport half of the pipeline.
//!
//! [`CacheTransport`] is registered as a transport factory. When a request
//! opted into caching and its entry is stored, it hands back a
//! [`CachedTransport`] that answers synchronously from the stored value
//! instead of touching the network.
//!
//! Freshness is not re-checked here: the prefilter has already removed
//! expired and rejected entries by the time transports are selected.

use std::sync::Arc;

use http::HeaderMap;
use reqstash_core::{
    CacheKey, CompleteCallback, Completion, DataType, RequestDescriptor, ResponseData, Transport,
    TransportFactory, is_valid_storage,
};

use crate::config::CacheSettings;
use crate::entry::{CacheEntry, Invalidation};
use crate::metrics;

/// Transport factory serving stored responses.
#[derive(Debug, Clone)]
pub struct CacheTransport {
    settings: Arc<CacheSettings>,
}

impl CacheTransport {
    /// Creates a factory over `settings`.
    pub fn new(settings: Arc<CacheSettings>) -> Self {
        Self { settings }
    }

    /// Looks up the stored response of `request`.
    ///
    /// Returns `None` when caching does not apply or nothing is stored. A
    /// stored payload that fails to parse is removed together with its
    /// expiry record and reported as a miss.
    pub fn lookup(&self, request: &RequestDescriptor) -> Option<CachedTransport> {
        let options = request.cache_options()?;
        let storage = self
            .settings
            .resolve_storage(&options.storage)
            .filter(|storage| is_valid_storage(Some(storage.as_ref())))?;

        let key = self.settings.derive_key(request);
        let entry = CacheEntry::new(storage, key, self.settings.ttl_suffix(options));

        let Some(raw) = entry.read() else {
            tracing::debug!(key = %entry.key(), "cache miss");
            metrics::record_miss(entry.backend());
            return None;
        };

        match ResponseData::from_body(&raw, request.data_type) {
            Ok(data) => {
                tracing::debug!(key = %entry.key(), data_type = %request.data_type, "cache hit");
                metrics::record_hit(entry.backend());
                Some(CachedTransport::new(
                    entry.key().clone(),
                    request.data_type,
                    data,
                ))
            }
            Err(err) => {
                tracing::warn!(key = %entry.key(), error = %err, "cached payload is corrupt, discarding");
                entry.invalidate(Invalidation::Corrupt);
                metrics::record_miss(entry.backend());
                None
            }
        }
    }
}

impl TransportFactory for CacheTransport {
    fn transport(&self, request: &RequestDescriptor) -> Option<Box<dyn Transport>> {
        self.lookup(request)
            .map(|transport| Box::new(transport) as Box<dyn Transport>)
    }
}

/// Transport answering from a stored response.
///
/// `send` completes synchronously with status 200 and status text
/// `"success"`; it delivers at most once. `abort` has nothing to cancel.
#[derive(Debug, Clone)]
pub struct CachedTransport {
    key: CacheKey,
    data_type: DataType,
    data: Option<ResponseData>,
}

impl CachedTransport {
    fn new(key: CacheKey, data_type: DataType, data: ResponseData) -> Self {
        Self {
            key,
            data_type,
            data: Some(data),
        }
    }

    /// Key the response was read from.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Data type the response was converted to.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The stored response, unless already sent.
    pub fn data(&self) -> Option<&ResponseData> {
        self.data.as_ref()
    }

    /// Takes the stored response, leaving nothing to send.
    pub fn take_data(&mut self) -> Option<ResponseData> {
        self.data.take()
    }
}

impl Transport for CachedTransport {
    fn send(&mut self, _headers: &HeaderMap, complete: CompleteCallback) {
        match self.data.take() {
            Some(data) => complete(Completion::success(self.data_type, data)),
            None => tracing::debug!(key = %self.key, "cached response already sent"),
        }
    }

    fn abort(&mut self) {
        tracing::debug!(key = %self.key, "abort on cached transport ignored");
    }
}
