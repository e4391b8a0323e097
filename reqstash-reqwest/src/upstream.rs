//! Conversions between reqwest messages and reqstash descriptors.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http_body_util::BodyExt;
use reqstash_core::{CacheOptions, DataType, Payload, RequestDescriptor, ResponseData};
use reqwest::{Request, Response};
use reqwest_middleware::Result;

/// Describes `request` for the caching pipeline.
///
/// Only the parts that take part in key derivation are carried over: url,
/// method and, when it is buffered, the body.
pub fn describe_request(
    request: &Request,
    data_type: DataType,
    options: CacheOptions,
) -> RequestDescriptor {
    let mut descriptor = RequestDescriptor::new(request.method().clone(), request.url().as_str())
        .data_type(data_type)
        .cache(options);
    if let Some(bytes) = request.body().and_then(|body| body.as_bytes())
        && !bytes.is_empty()
    {
        descriptor.data = Some(Payload::Text(String::from_utf8_lossy(bytes).into_owned()));
    }
    descriptor
}

/// Reads a response body into memory.
///
/// Returns the response head together with the collected bytes so the
/// response can be rebuilt after inspection.
pub async fn buffer_response(response: Response) -> Result<(http::response::Parts, Bytes)> {
    let http_response: http::Response<reqwest::Body> = response.into();
    let (parts, body) = http_response.into_parts();
    let bytes = body
        .collect()
        .await
        .map_err(reqwest_middleware::Error::Reqwest)?
        .to_bytes();
    Ok((parts, bytes))
}

/// Rebuilds a response from its head and buffered body.
pub fn rebuild_response(parts: http::response::Parts, body: Bytes) -> Response {
    http::Response::from_parts(parts, reqwest::Body::from(body)).into()
}

/// Synthesizes the `200` response of a cache hit.
pub fn cached_response(
    data_type: DataType,
    data: ResponseData,
    status_header: &HeaderName,
) -> Response {
    let mut response = http::Response::new(reqwest::Body::from(data.to_body()));
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(data_type.content_type()),
    );
    headers.insert(status_header.clone(), HeaderValue::from_static("HIT"));
    response.into()
}
