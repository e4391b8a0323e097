//! Cache key types and derivation.
//!
//! This module provides:
//!
//! - [`CacheKey`] - The string identifying a cached request's slot
//! - [`KeyDeriver`] - Pure mapping from a request descriptor to its key
//!
//! ## Derivation
//!
//! An explicit `cache_key` option wins when it is non-blank. Otherwise the
//! key is built from the request:
//!
//! `{normalized url}{separator}{METHOD}{serialized payload}`
//!
//! Normalizing the url removes everything from the dispatcher's JSONP
//! callback marker onwards and, for requests sent with `http_cache(false)`,
//! the `_=<13-digit timestamp>` cache buster. The separator is empty by
//! default.
//!
//! ```
//! use reqstash_core::{CacheOptions, KeyDeriver, RequestDescriptor};
//!
//! let deriver = KeyDeriver::default();
//!
//! let request = RequestDescriptor::get("/posts?_=1700000000000").http_cache(false);
//! assert_eq!(deriver.derive(&request).as_str(), "/postsGET");
//!
//! let request = RequestDescriptor::get("/posts")
//!     .cache(CacheOptions::default_store().cache_key("post-list"));
//! assert_eq!(deriver.derive(&request).as_str(), "post-list");
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use smol_str::SmolStr;

use crate::request::RequestDescriptor;

/// Prefix of the JSONP callback names the dispatcher injects into urls.
pub const CALLBACK_MARKER: &str = "__reqstash_cb";

static CALLBACK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("{}.*", regex::escape(CALLBACK_MARKER)))
        .expect("callback marker pattern is valid")
});

static CACHE_BUSTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\??_=\d{13}").expect("cache buster pattern is valid"));

/// A derived cache key.
///
/// Cloning only bumps a reference count.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Wraps an already derived key.
    pub fn new(key: impl AsRef<str>) -> Self {
        CacheKey(Arc::from(key.as_ref()))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of this entry's expiry record.
    pub fn record_key(&self, suffix: &str) -> String {
        crate::expiry::record_key(self, suffix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        CacheKey::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        CacheKey(Arc::from(key))
    }
}

/// Derives cache keys from request descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDeriver {
    separator: SmolStr,
}

impl KeyDeriver {
    /// Deriver placing `separator` between url and method.
    pub fn with_separator(separator: impl Into<SmolStr>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Separator between the normalized url and the method.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Derives the key of `request`.
    ///
    /// Pure: identical descriptors always produce identical keys, whatever
    /// their callbacks.
    pub fn derive(&self, request: &RequestDescriptor) -> CacheKey {
        let explicit = request
            .cache
            .as_ref()
            .and_then(|options| options.cache_key.as_deref())
            .filter(|key| !key.trim().is_empty());
        if let Some(key) = explicit {
            return CacheKey::new(key);
        }

        let url = normalize_url(&request.url, request.http_cache);
        let payload = request
            .data
            .as_ref()
            .map(|data| data.serialize())
            .unwrap_or_default();

        CacheKey::from(format!(
            "{url}{}{}{payload}",
            self.separator,
            request.method.as_str()
        ))
    }
}

/// Strips the callback marker and, when `http_cache` is off, the cache buster.
pub fn normalize_url(url: &str, http_cache: bool) -> String {
    let url = CALLBACK_PATTERN.replace(url, "");
    if http_cache {
        url.into_owned()
    } else {
        CACHE_BUSTER_PATTERN.replace(&url, "").into_owned()
    }
}
