//! Request descriptors and per-request caching options.
//!
//! A [`RequestDescriptor`] is the caller-owned configuration of one fetch:
//! target url, method, payload, expected response [`DataType`] and the
//! optional [`CacheOptions`] that opt the request into caching. The pipeline
//! only reads the descriptor, except for the success handler which the
//! prefilter may wrap.
//!
//! ```
//! use reqstash_core::{CacheOptions, DataType, RequestDescriptor};
//!
//! let request = RequestDescriptor::get("https://example.com/posts")
//!     .data_type(DataType::Json)
//!     .cache(CacheOptions::default_store().ttl_minutes(5.0));
//!
//! assert!(request.cache.as_ref().is_some_and(|options| options.is_enabled()));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};

use crate::response::ResponseData;
use crate::storage::Storage;

/// Callback receiving the converted response data of a successful request.
pub type SuccessHandler = Box<dyn FnOnce(ResponseData) + Send + 'static>;

/// Caller predicate deciding whether a cached entry may still be used.
pub type ValidityPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Expected format of the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Plain text.
    #[default]
    Text,
    /// HTML document.
    Html,
    /// XML document.
    Xml,
    /// Script source.
    Script,
    /// JSON document.
    Json,
    /// JSON wrapped in a callback invocation.
    Jsonp,
}

impl DataType {
    /// Returns the data type name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Html => "html",
            DataType::Xml => "xml",
            DataType::Script => "script",
            DataType::Json => "json",
            DataType::Jsonp => "jsonp",
        }
    }

    /// Structured types are stored serialized and parsed back on read.
    pub fn is_structured(&self) -> bool {
        self.as_str().starts_with("json")
    }

    /// Content type advertised for a body of this type.
    pub const fn content_type(&self) -> &'static str {
        match self {
            DataType::Text => "text/plain; charset=utf-8",
            DataType::Html => "text/html; charset=utf-8",
            DataType::Xml => "application/xml",
            DataType::Script => "text/javascript",
            DataType::Json | DataType::Jsonp => "application/json",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown data type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data type `{0}`")]
pub struct UnknownDataType(pub String);

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(DataType::Text),
            "html" => Ok(DataType::Html),
            "xml" => Ok(DataType::Xml),
            "script" => Ok(DataType::Script),
            "json" => Ok(DataType::Json),
            "jsonp" => Ok(DataType::Jsonp),
            other => Err(UnknownDataType(other.to_string())),
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Pre-serialized text sent as-is.
    Text(String),
    /// Form fields, URL-encoded in order.
    Form(Vec<(String, String)>),
    /// JSON document, compact-serialized.
    Json(serde_json::Value),
}

impl Payload {
    /// Serialized form used on the wire and in cache keys.
    pub fn serialize(&self) -> String {
        match self {
            Payload::Text(text) => text.clone(),
            Payload::Form(fields) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields)
                .finish(),
            // Value serialization cannot fail: map keys are always strings.
            Payload::Json(value) => value.to_string(),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// Which store a request caches into.
#[derive(Clone, Default)]
pub enum StorageSelector {
    /// Caching disabled for this request.
    #[default]
    Disabled,
    /// The default durable store configured on the pipeline.
    Default,
    /// A caller-supplied store.
    Custom(Arc<dyn Storage>),
}

impl StorageSelector {
    /// Whether the selector opts the request into caching at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, StorageSelector::Disabled)
    }
}

impl From<bool> for StorageSelector {
    fn from(enabled: bool) -> Self {
        if enabled {
            StorageSelector::Default
        } else {
            StorageSelector::Disabled
        }
    }
}

impl fmt::Debug for StorageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageSelector::Disabled => f.write_str("Disabled"),
            StorageSelector::Default => f.write_str("Default"),
            StorageSelector::Custom(storage) => {
                f.debug_tuple("Custom").field(&storage.name()).finish()
            }
        }
    }
}

/// Per-request caching options.
///
/// Attach to a [`RequestDescriptor`] to opt it into caching. Cloning is
/// cheap; stores and predicates are reference counted.
#[derive(Clone, Default)]
pub struct CacheOptions {
    /// Store selection.
    pub storage: StorageSelector,
    /// Expiry horizon in minutes. Non-positive values fall back to the default.
    pub ttl_minutes: Option<f64>,
    /// Explicit cache key, used verbatim when non-blank.
    pub cache_key: Option<String>,
    /// Returns `false` to invalidate the cached entry before it expires.
    pub is_cache_valid: Option<ValidityPredicate>,
    /// Overrides the suffix of the expiry record key when non-blank.
    pub ttl_suffix: Option<String>,
}

impl CacheOptions {
    /// Cache into the default durable store.
    pub fn default_store() -> Self {
        Self {
            storage: StorageSelector::Default,
            ..Self::default()
        }
    }

    /// Cache into `storage`.
    pub fn with_storage(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage: StorageSelector::Custom(storage),
            ..Self::default()
        }
    }

    /// Options that explicitly disable caching.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Sets the TTL override in minutes.
    pub fn ttl_minutes(mut self, minutes: f64) -> Self {
        self.ttl_minutes = Some(minutes);
        self
    }

    /// Sets an explicit cache key.
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Sets the validity predicate.
    pub fn is_cache_valid<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.is_cache_valid = Some(Arc::new(predicate));
        self
    }

    /// Sets the expiry record suffix.
    pub fn ttl_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.ttl_suffix = Some(suffix.into());
        self
    }

    /// Whether these options opt the request into caching.
    pub fn is_enabled(&self) -> bool {
        self.storage.is_enabled()
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("storage", &self.storage)
            .field("ttl_minutes", &self.ttl_minutes)
            .field("cache_key", &self.cache_key)
            .field(
                "is_cache_valid",
                &self.is_cache_valid.as_ref().map(|_| "..."),
            )
            .field("ttl_suffix", &self.ttl_suffix)
            .finish()
    }
}

/// Configuration of a single fetch operation.
pub struct RequestDescriptor {
    /// Target address.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request payload.
    pub data: Option<Payload>,
    /// Expected response format.
    pub data_type: DataType,
    /// `false` asks the dispatcher to defeat intermediary HTTP caches.
    pub http_cache: bool,
    /// Request headers.
    pub headers: HeaderMap,
    /// Caching options; `None` keeps the request out of the pipeline.
    pub cache: Option<CacheOptions>,
    /// Invoked with the converted data on success.
    pub success: Option<SuccessHandler>,
}

impl RequestDescriptor {
    /// Creates a descriptor for `method` on `url`.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            data: None,
            data_type: DataType::default(),
            http_cache: true,
            headers: HeaderMap::new(),
            cache: None,
            success: None,
        }
    }

    /// Creates a `GET` descriptor.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a `POST` descriptor.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Sets the payload.
    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets the expected response format.
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Enables or disables intermediary HTTP caching.
    pub fn http_cache(mut self, enabled: bool) -> Self {
        self.http_cache = enabled;
        self
    }

    /// Attaches caching options.
    pub fn cache(mut self, options: CacheOptions) -> Self {
        self.cache = Some(options);
        self
    }

    /// Sets the success handler.
    pub fn on_success<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(ResponseData) + Send + 'static,
    {
        self.success = Some(Box::new(handler));
        self
    }

    /// Caching options, if the request opted into caching.
    pub fn cache_options(&self) -> Option<&CacheOptions> {
        self.cache.as_ref().filter(|options| options.is_enabled())
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("data", &self.data)
            .field("data_type", &self.data_type)
            .field("http_cache", &self.http_cache)
            .field("cache", &self.cache)
            .field("success", &self.success.as_ref().map(|_| "..."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_data_types() {
        assert!(DataType::Json.is_structured());
        assert!(DataType::Jsonp.is_structured());
        assert!(!DataType::Text.is_structured());
        assert!(!DataType::Html.is_structured());
    }

    #[test]
    fn test_data_type_from_str_is_case_insensitive() {
        assert_eq!("JSON".parse::<DataType>(), Ok(DataType::Json));
        assert_eq!(
            "yaml".parse::<DataType>(),
            Err(UnknownDataType("yaml".to_string()))
        );
    }

    #[test]
    fn test_form_payload_serialization() {
        let payload = Payload::Form(vec![
            ("q".to_string(), "rust cache".to_string()),
            ("page".to_string(), "2".to_string()),
        ]);
        assert_eq!(payload.serialize(), "q=rust+cache&page=2");
    }

    #[test]
    fn test_json_payload_serialization_is_compact() {
        let payload = Payload::Json(serde_json::json!({"a": 1}));
        assert_eq!(payload.serialize(), r#"{"a":1}"#);
    }

    #[test]
    fn test_disabled_options_are_ignored() {
        let request = RequestDescriptor::get("/posts").cache(CacheOptions::disabled());
        assert!(request.cache_options().is_none());
    }
}
