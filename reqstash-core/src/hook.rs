//! Extension points of a request-execution framework.
//!
//! A framework runs every outgoing request through two stages:
//!
//! 1. **Prefilters** see the mutable [`RequestDescriptor`] before dispatch and
//!    may rewrite it (for example wrap its success handler).
//! 2. **Transport factories** are asked, in registration order, for a
//!    [`Transport`] able to produce the response. The first one returning a
//!    handle wins; if none does, the request goes to the network.
//!
//! The two stages share no state beyond what each hook persists itself.

use http::HeaderMap;

use crate::request::RequestDescriptor;
use crate::response::CompleteCallback;

/// Pre-dispatch hook.
pub trait Prefilter: Send + Sync {
    /// Inspects and possibly rewrites `request` before it is dispatched.
    fn prefilter(&self, request: &mut RequestDescriptor);
}

/// Transport substitution hook.
pub trait TransportFactory: Send + Sync {
    /// Returns a transport for `request`, or `None` to defer to the next
    /// factory and ultimately the network.
    fn transport(&self, request: &RequestDescriptor) -> Option<Box<dyn Transport>>;
}

/// Mechanism producing the response of one request.
pub trait Transport: Send {
    /// Starts the request; `complete` receives the outcome.
    ///
    /// Called at most once per request.
    fn send(&mut self, headers: &HeaderMap, complete: CompleteCallback);

    /// Cancels an in-flight request.
    fn abort(&mut self);
}

impl<F> Prefilter for F
where
    F: Fn(&mut RequestDescriptor) + Send + Sync,
{
    fn prefilter(&self, request: &mut RequestDescriptor) {
        self(request)
    }
}
