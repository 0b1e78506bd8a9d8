//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the caller sent none
//! - Buffer the complete inbound body into an [`InboundRequest`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing; it is relayed to
//!   both upstreams along with the other headers
//! - The path is taken verbatim (path and query) from the request target

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::proxy::body::read_to_end;
use crate::proxy::request::InboundRequest;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID generator backed by UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID header, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Wait for the whole inbound body and snapshot the request.
pub async fn buffer_request(request: Request<Body>) -> Result<InboundRequest, axum::Error> {
    let (parts, body) = request.into_parts();
    let body = read_to_end(body).await?;
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Ok(InboundRequest::new(parts.method, parts.headers, path, body))
}
