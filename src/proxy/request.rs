//! Snapshot of an inbound request, shared read-only by both upstream attempts.

use bytes::Bytes;
use hyper::{HeaderMap, Method};

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub headers: HeaderMap,
    /// Request target (path and query), relayed verbatim.
    pub path: String,
    pub body: Bytes,
}

impl InboundRequest {
    pub fn new(method: Method, headers: HeaderMap, path: impl Into<String>, body: Bytes) -> Self {
        Self {
            method,
            headers,
            path: path.into(),
            body,
        }
    }
}
