//! Synchronous request dispatcher.
//!
//! [`Dispatcher`] is a small request-execution framework exposing the two
//! hook points the cache plugs into: prefilters and transport factories.
//! Requests that no transport claims go to the [`Upstream`].
//!
//! A dispatch runs in this order:
//!
//! 1. `jsonp` requests get a `callback=__reqstash_cb<n>` query parameter.
//! 2. Prefilters run in registration order.
//! 3. `GET`/`HEAD` requests with `http_cache(false)` get a `_=<epoch ms>`
//!    cache buster.
//! 4. Transport factories registered for the request's data type are asked,
//!    most recently registered first. The first handle returned is sent.
//!    Without one, the upstream is called.
//! 5. Successful completions (2xx or 304) are converted to the request's
//!    data type and handed to the success handler.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use http::{HeaderMap, Method, StatusCode};
use reqstash_core::{
    CALLBACK_MARKER, Clock, Completion, DataType, Prefilter, RequestDescriptor, ResponseData,
    ResponseMap, SystemClock, Transport, TransportFactory, Upstream, UpstreamResponse,
};

use crate::error::DispatchError;

/// Data types a transport factory is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataTypePattern {
    /// Every data type.
    #[default]
    Any,
    /// A single data type.
    Only(DataType),
}

impl DataTypePattern {
    /// Whether requests of `data_type` match.
    pub fn matches(&self, data_type: DataType) -> bool {
        match self {
            DataTypePattern::Any => true,
            DataTypePattern::Only(expected) => *expected == data_type,
        }
    }
}

/// Where a dispatched response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// A registered transport produced it without going to the network.
    Cache,
    /// The upstream produced it.
    Upstream,
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Response status.
    pub status: StatusCode,
    /// Status text.
    pub status_text: String,
    /// Converted response data, as handed to the success handler.
    pub data: ResponseData,
    /// Origin of the response.
    pub source: ResponseSource,
}

/// Synchronous request dispatcher.
///
/// ```
/// use reqstash::Dispatcher;
/// use reqstash_core::{RequestDescriptor, UpstreamError, UpstreamResponse};
///
/// let mut dispatcher = Dispatcher::new(|_: &RequestDescriptor| {
///     Ok::<_, UpstreamError>(UpstreamResponse::ok("hello"))
/// });
///
/// let outcome = dispatcher.dispatch(RequestDescriptor::get("/greeting")).unwrap();
/// assert_eq!(outcome.data.as_text(), Some("hello"));
/// ```
pub struct Dispatcher<U> {
    prefilters: Vec<Arc<dyn Prefilter>>,
    transports: Vec<(DataTypePattern, Arc<dyn TransportFactory>)>,
    upstream: U,
    clock: Arc<dyn Clock>,
    callback_seq: u64,
}

impl<U: Upstream> Dispatcher<U> {
    /// Creates a dispatcher sending unclaimed requests to `upstream`.
    pub fn new(upstream: U) -> Self {
        Self {
            prefilters: Vec::new(),
            transports: Vec::new(),
            upstream,
            clock: Arc::new(SystemClock),
            callback_seq: 0,
        }
    }

    /// Replaces the clock used for cache busters.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registers a prefilter; prefilters run in registration order.
    pub fn register_prefilter<P>(&mut self, prefilter: P) -> &mut Self
    where
        P: Prefilter + 'static,
    {
        self.prefilters.push(Arc::new(prefilter));
        self
    }

    /// Registers a transport factory ahead of all previously registered ones.
    pub fn register_transport<T>(&mut self, pattern: DataTypePattern, factory: T) -> &mut Self
    where
        T: TransportFactory + 'static,
    {
        self.transports.insert(0, (pattern, Arc::new(factory)));
        self
    }

    /// The upstream.
    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Mutable access to the upstream.
    pub fn upstream_mut(&mut self) -> &mut U {
        &mut self.upstream
    }

    /// Executes `request`.
    ///
    /// # Errors
    ///
    /// See [`DispatchError`]. The success handler only runs on `Ok`.
    pub fn dispatch(&mut self, mut request: RequestDescriptor) -> Result<Outcome, DispatchError> {
        let callback = self.inject_callback(&mut request);

        for prefilter in &self.prefilters {
            prefilter.prefilter(&mut request);
        }

        self.inject_cache_buster(&mut request);

        let success = request.success.take();
        let (completion, source) = match self.select_transport(&request) {
            Some(mut transport) => {
                let slot: Arc<Mutex<Option<Completion>>> = Arc::default();
                let sink = Arc::clone(&slot);
                transport.send(
                    &request.headers,
                    Box::new(move |completion| {
                        *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(completion);
                    }),
                );
                // Transports complete within `send`; an empty slot means they never will.
                let completion = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                let Some(completion) = completion else {
                    transport.abort();
                    return Err(DispatchError::Incomplete);
                };
                (completion, ResponseSource::Cache)
            }
            None => {
                let response = self
                    .upstream
                    .call(&request)
                    .map_err(DispatchError::Upstream)?;
                (upstream_completion(response), ResponseSource::Upstream)
            }
        };

        tracing::debug!(
            url = %request.url,
            status = completion.status.as_u16(),
            ?source,
            "request completed"
        );

        if !completion.is_success() {
            return Err(DispatchError::Status {
                status: completion.status,
                status_text: completion.status_text,
            });
        }
        let data = convert(completion.responses, request.data_type, callback.as_deref())?;

        if let Some(success) = success {
            success(data.clone());
        }

        Ok(Outcome {
            status: completion.status,
            status_text: completion.status_text,
            data,
            source,
        })
    }

    fn inject_callback(&mut self, request: &mut RequestDescriptor) -> Option<String> {
        if request.data_type != DataType::Jsonp {
            return None;
        }
        self.callback_seq += 1;
        let name = format!("{CALLBACK_MARKER}{}", self.callback_seq);
        append_query(&mut request.url, &format!("callback={name}"));
        Some(name)
    }

    fn inject_cache_buster(&self, request: &mut RequestDescriptor) {
        if request.http_cache || !(request.method == Method::GET || request.method == Method::HEAD)
        {
            return;
        }
        let now = self.clock.now_millis();
        append_query(&mut request.url, &format!("_={now}"));
    }

    fn select_transport(&self, request: &RequestDescriptor) -> Option<Box<dyn Transport>> {
        self.transports
            .iter()
            .filter(|(pattern, _)| pattern.matches(request.data_type))
            .find_map(|(_, factory)| factory.transport(request))
    }
}

fn append_query(url: &mut String, pair: &str) {
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(pair);
}

fn upstream_completion(response: UpstreamResponse) -> Completion {
    let status_text = if response.status == StatusCode::NOT_MODIFIED {
        "notmodified"
    } else if response.status.is_success() {
        "success"
    } else {
        response.status.canonical_reason().unwrap_or("error")
    };
    let mut responses = ResponseMap::with_capacity(1);
    responses.insert(DataType::Text, ResponseData::Text(response.body));
    Completion {
        status: response.status,
        status_text: status_text.to_string(),
        responses,
        headers: raw_headers(&response.headers),
    }
}

fn raw_headers(headers: &HeaderMap) -> String {
    let mut raw = String::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        let _ = write!(raw, "{name}: {value}\r\n");
    }
    raw
}

/// Picks the response for `data_type`, parsing the text response when no
/// converted one is present.
fn convert(
    mut responses: ResponseMap,
    data_type: DataType,
    callback: Option<&str>,
) -> Result<ResponseData, DispatchError> {
    if let Some(data) = responses.remove(&data_type) {
        return Ok(data);
    }
    let text = responses
        .remove(&DataType::Text)
        .map(|data| data.to_body())
        .unwrap_or_default();
    let body = match callback {
        Some(callback) => unwrap_jsonp(&text, callback),
        None => text.as_str(),
    };
    ResponseData::from_body(body, data_type)
        .map_err(|source| DispatchError::Parse { data_type, source })
}

/// Strips a `callback(...)` wrapper; other bodies are returned as-is.
fn unwrap_jsonp<'a>(body: &'a str, callback: &str) -> &'a str {
    let trimmed = body.trim();
    trimmed
        .strip_prefix(callback)
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('('))
        .map(|rest| rest.trim_end().trim_end_matches(';').trim_end())
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(body)
}
