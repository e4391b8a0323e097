use http::StatusCode;
use reqstash_core::{DataType, UpstreamError};

/// Error returned by [`Dispatcher::dispatch`](crate::Dispatcher::dispatch).
///
/// Cache-layer failures never surface here: they are logged and the request
/// proceeds as if caching were disabled.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The network call failed before producing a response.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] UpstreamError),
    /// The response status is neither 2xx nor 304.
    #[error("request failed with status {status}: {status_text}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Status text reported with it.
        status_text: String,
    },
    /// The body could not be converted to the expected data type.
    #[error("response is not valid {data_type}")]
    Parse {
        /// Expected data type.
        data_type: DataType,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A transport returned without invoking its completion callback.
    #[error("transport finished without completing the request")]
    Incomplete,
}
