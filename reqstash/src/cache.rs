use std::sync::Arc;

use reqstash_core::Upstream;

use crate::config::CacheSettings;
use crate::dispatcher::{DataTypePattern, Dispatcher};
use crate::prefilter::CachePrefilter;
use crate::transport::CacheTransport;

/// Entry point of the caching pipeline.
///
/// Owns the shared [`CacheSettings`] and hands out the two hooks built on
/// them. [`install`](Self::install) registers both on a [`Dispatcher`];
/// other integrations (such as the reqwest middleware) drive the hooks
/// directly.
///
/// ```
/// use std::sync::Arc;
/// use reqstash::{CacheSettings, Dispatcher, LocalCache};
/// use reqstash_backend::MemoryStorage;
/// use reqstash_core::{RequestDescriptor, UpstreamError, UpstreamResponse};
///
/// let cache = LocalCache::new(
///     CacheSettings::builder()
///         .default_storage(Arc::new(MemoryStorage::new()))
///         .build(),
/// );
///
/// let mut dispatcher = Dispatcher::new(|_: &RequestDescriptor| {
///     Ok::<_, UpstreamError>(UpstreamResponse::ok("fresh"))
/// });
/// cache.install(&mut dispatcher);
/// ```
#[derive(Debug, Clone)]
pub struct LocalCache {
    settings: Arc<CacheSettings>,
}

impl LocalCache {
    /// Creates the pipeline over `settings`.
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    /// Shared settings.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// The request prefilter.
    pub fn prefilter(&self) -> CachePrefilter {
        CachePrefilter::new(Arc::clone(&self.settings))
    }

    /// The transport factory.
    pub fn transport(&self) -> CacheTransport {
        CacheTransport::new(Arc::clone(&self.settings))
    }

    /// Registers the prefilter and, for every data type, the transport.
    pub fn install<U: Upstream>(&self, dispatcher: &mut Dispatcher<U>) {
        dispatcher
            .register_prefilter(self.prefilter())
            .register_transport(DataTypePattern::Any, self.transport());
        tracing::debug!(settings = ?self.settings, "local cache installed");
    }
}

impl From<CacheSettings> for LocalCache {
    fn from(settings: CacheSettings) -> Self {
        Self::new(settings)
    }
}
