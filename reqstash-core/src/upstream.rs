//! Network fallback used when no transport intercepts a request.

use http::{HeaderMap, StatusCode};

use crate::request::RequestDescriptor;

/// Error produced by an upstream call.
pub type UpstreamError = Box<dyn std::error::Error + Send + Sync>;

/// Raw response returned by the network.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body as text.
    pub body: String,
}

impl UpstreamResponse {
    /// Response with `status` and `body` and no headers.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// `200 OK` response with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }
}

/// Trait for calling the network when no transport intercepted a request.
/// This trait is framework-agnostic and can be implemented for any client.
///
/// # Examples
///
/// ```rust
/// use reqstash_core::{RequestDescriptor, Upstream, UpstreamError, UpstreamResponse};
///
/// struct Fixed(&'static str);
///
/// impl Upstream for Fixed {
///     fn call(&mut self, _request: &RequestDescriptor) -> Result<UpstreamResponse, UpstreamError> {
///         Ok(UpstreamResponse::ok(self.0))
///     }
/// }
///
/// let mut upstream = Fixed("hello");
/// let response = upstream.call(&RequestDescriptor::get("/greeting")).unwrap();
/// assert_eq!(response.body, "hello");
/// ```
pub trait Upstream {
    /// Performs the network round trip for `request`.
    fn call(&mut self, request: &RequestDescriptor) -> Result<UpstreamResponse, UpstreamError>;
}

impl<F> Upstream for F
where
    F: FnMut(&RequestDescriptor) -> Result<UpstreamResponse, UpstreamError>,
{
    fn call(&mut self, request: &RequestDescriptor) -> Result<UpstreamResponse, UpstreamError> {
        self(request)
    }
}
