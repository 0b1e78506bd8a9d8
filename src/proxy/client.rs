//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Relay one buffered inbound request to one upstream
//! - Copy end-to-end headers, rewrite `Host` to the upstream authority
//! - Buffer the full response body
//! - Enforce connect and per-attempt deadlines
//!
//! # Design Decisions
//! - [`UpstreamClient`] is the seam between dispatch logic and the network
//! - Body read errors after the status line count as transport failures

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::HOST;
use hyper::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::proxy::body::read_to_end;
use crate::proxy::headers::copy_end_to_end;
use crate::proxy::request::InboundRequest;
use crate::proxy::upstream::{Upstream, UpstreamResponse};

/// Failures that prevent a complete upstream response from being received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build upstream request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("upstream connection failed: {0}")]
    Connect(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream body: {0}")]
    Body(#[from] hyper::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// Sends a buffered request to an upstream and returns the buffered response.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn execute(
        &self,
        target: &Upstream,
        request: &InboundRequest,
    ) -> Result<UpstreamResponse, TransportError>;
}

/// [`UpstreamClient`] backed by the hyper connection pool.
#[derive(Debug, Clone)]
pub struct HyperUpstreamClient {
    inner: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl HyperUpstreamClient {
    /// Create a pooled client with a connect timeout and a per-attempt deadline.
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let inner = Client::builder(TokioExecutor::new()).build(connector);
        Self { inner, timeout }
    }

    /// Per-attempt deadline, covering connect, headers and body.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn round_trip(
        &self,
        target: &Upstream,
        request: &InboundRequest,
    ) -> Result<UpstreamResponse, TransportError> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(target.uri_for(&request.path)?)
            .header(HOST, target.authority().as_str());
        if let Some(headers) = builder.headers_mut() {
            copy_end_to_end(&request.headers, headers, &[HOST]);
        }
        let outbound = builder.body(Full::new(request.body.clone()))?;

        let response = self.inner.request(outbound).await?;
        let (parts, body) = response.into_parts();
        let body = read_to_end(body).await?;

        Ok(UpstreamResponse::new(parts.status, parts.headers, body))
    }
}

#[async_trait]
impl UpstreamClient for HyperUpstreamClient {
    async fn execute(
        &self,
        target: &Upstream,
        request: &InboundRequest,
    ) -> Result<UpstreamResponse, TransportError> {
        match tokio::time::timeout(self.timeout, self.round_trip(target, request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }
}
