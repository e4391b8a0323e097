//! Cache middleware for reqwest-middleware.

use async_trait::async_trait;
use http::Extensions;
use http::header::{HeaderName, HeaderValue};
use reqstash::{LocalCache, PrefilterDecision};
use reqstash_core::{CacheOptions, DataType, ResponseData};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

use crate::upstream::{buffer_response, cached_response, describe_request, rebuild_response};

/// Header reporting whether a response came from the cache.
pub const DEFAULT_CACHE_STATUS_HEADER: &str = "x-cache-status";

/// Cache middleware for reqwest-middleware.
///
/// Requests opt in by carrying [`CacheOptions`] as an extension; the
/// expected [`DataType`] travels the same way and defaults to text. Other
/// requests pass through untouched.
///
/// Cache hits are answered with a synthetic `200` response. Successful
/// network responses are buffered, stored and handed back rebuilt. Both
/// carry an `X-Cache-Status` header (`HIT` or `MISS`).
#[derive(Debug, Clone)]
pub struct LocalCacheMiddleware {
    cache: LocalCache,
    status_header: HeaderName,
}

impl LocalCacheMiddleware {
    /// Create a new cache middleware.
    pub fn new(cache: LocalCache) -> Self {
        Self {
            cache,
            status_header: HeaderName::from_static(DEFAULT_CACHE_STATUS_HEADER),
        }
    }

    /// Replaces the header reporting the cache status.
    pub fn cache_status_header(mut self, name: HeaderName) -> Self {
        self.status_header = name;
        self
    }

    /// The underlying cache.
    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }
}

impl From<LocalCache> for LocalCacheMiddleware {
    fn from(cache: LocalCache) -> Self {
        Self::new(cache)
    }
}

#[async_trait]
impl Middleware for LocalCacheMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let Some(options) = extensions
            .get::<CacheOptions>()
            .filter(|options| options.is_enabled())
            .cloned()
        else {
            return next.run(req, extensions).await;
        };
        let data_type = extensions.get::<DataType>().copied().unwrap_or_default();

        let mut descriptor = describe_request(&req, data_type, options);
        match self.cache.prefilter().apply(&mut descriptor) {
            PrefilterDecision::PassThrough | PrefilterDecision::InvalidStorage => {
                return next.run(req, extensions).await;
            }
            PrefilterDecision::Fresh { .. } | PrefilterDecision::Populate { .. } => {}
        }

        if let Some(data) = self
            .cache
            .transport()
            .lookup(&descriptor)
            .and_then(|mut cached| cached.take_data())
        {
            return Ok(cached_response(data_type, data, &self.status_header));
        }

        let response = next.run(req, extensions).await?;
        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), url = %descriptor.url, "response not cacheable");
            return Ok(response);
        }

        let (mut parts, body) = buffer_response(response).await?;
        if let Some(store) = descriptor.success.take() {
            match std::str::from_utf8(&body)
                .ok()
                .map(|text| ResponseData::from_body(text, data_type))
            {
                Some(Ok(data)) => store(data),
                Some(Err(err)) => {
                    tracing::debug!(url = %descriptor.url, error = %err, "response body does not match data type, not cached");
                }
                None => {
                    tracing::debug!(url = %descriptor.url, "response body is not text, not cached");
                }
            }
        }

        parts
            .headers
            .insert(self.status_header.clone(), HeaderValue::from_static("MISS"));
        Ok(rebuild_response(parts, body))
    }
}
