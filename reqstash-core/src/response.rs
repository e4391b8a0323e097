//! Response data and transport completion types.

use std::collections::HashMap;
use std::fmt;

use http::StatusCode;

use crate::request::DataType;

/// Converted response body handed to success handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// Raw text body.
    Text(String),
    /// Parsed JSON body.
    Json(serde_json::Value),
}

impl ResponseData {
    /// Converts a raw body according to `data_type`.
    ///
    /// Structured types are parsed as JSON; everything else stays text.
    pub fn from_body(body: &str, data_type: DataType) -> Result<Self, serde_json::Error> {
        if data_type.is_structured() {
            serde_json::from_str(body).map(ResponseData::Json)
        } else {
            Ok(ResponseData::Text(body.to_string()))
        }
    }

    /// String written into the cache entry.
    ///
    /// Structured types are JSON-serialized, so text data under a structured
    /// type is stored as a JSON string literal and reads back as one.
    pub fn to_cache_string(&self, data_type: DataType) -> Result<String, serde_json::Error> {
        match (self, data_type.is_structured()) {
            (ResponseData::Json(value), _) => serde_json::to_string(value),
            (ResponseData::Text(text), true) => serde_json::to_string(text),
            (ResponseData::Text(text), false) => Ok(text.clone()),
        }
    }

    /// Bytes of the body as sent over the wire.
    pub fn to_body(&self) -> String {
        match self {
            ResponseData::Text(text) => text.clone(),
            ResponseData::Json(value) => value.to_string(),
        }
    }

    /// Returns the text body, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            ResponseData::Json(_) => None,
        }
    }

    /// Returns the JSON body, if any.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            ResponseData::Text(_) => None,
        }
    }
}

/// Converted responses keyed by data type.
pub type ResponseMap = HashMap<DataType, ResponseData>;

/// Outcome a transport reports to the dispatcher.
#[derive(Clone, PartialEq)]
pub struct Completion {
    /// Response status.
    pub status: StatusCode,
    /// Human readable status text.
    pub status_text: String,
    /// Responses keyed by data type.
    pub responses: ResponseMap,
    /// Raw response headers.
    pub headers: String,
}

impl Completion {
    /// Successful completion carrying `data` under `data_type`.
    pub fn success(data_type: DataType, data: ResponseData) -> Self {
        let mut responses = ResponseMap::with_capacity(1);
        responses.insert(data_type, data);
        Self {
            status: StatusCode::OK,
            status_text: "success".to_string(),
            responses,
            headers: String::new(),
        }
    }

    /// Whether the status denotes success (2xx or 304).
    pub fn is_success(&self) -> bool {
        self.status.is_success() || self.status == StatusCode::NOT_MODIFIED
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("responses", &self.responses.keys().collect::<Vec<_>>())
            .field("headers", &self.headers)
            .finish()
    }
}

/// Callback a transport invokes exactly once when it completes.
pub type CompleteCallback = Box<dyn FnOnce(Completion) + Send + 'static>;
