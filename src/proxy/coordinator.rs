//! Per-request coordination across the primary and secondary upstreams.
//!
//! # Data Flow
//! ```text
//! InboundRequest (Received)
//!     → DispatchPolicy::for_method
//!     → Failover:  primary ──fail──▶ secondary ──fail──▶ primary's outcome
//!     → DualSend:  primary ─┬─▶ final response
//!                  secondary ┘ (shadow, observed only)
//!     → ResponseWriter::write (Resolved)
//! ```
//!
//! # Design Decisions
//! - `ResponseWriter::write` consumes the writer: one final response per request
//! - Shadow attempts run in their own task and never touch the writer
//! - Dropping the caller side does not cancel in-flight attempts

use std::sync::Arc;

use bytes::Bytes;
use hyper::{HeaderMap, StatusCode};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::observability::metrics::UpstreamMetrics;
use crate::proxy::client::UpstreamClient;
use crate::proxy::policy::DispatchPolicy;
use crate::proxy::request::InboundRequest;
use crate::proxy::upstream::{
    AttemptObserver, ResolvedAttempt, Role, Upstream, UpstreamAttempt, UpstreamResponse,
};

/// The single response delivered to the original caller.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResponse {
    source: Role,
    response: UpstreamResponse,
}

impl FinalResponse {
    pub fn new(source: Role, response: UpstreamResponse) -> Self {
        Self { source, response }
    }

    /// Upstream whose outcome authored this response.
    pub fn source(&self) -> Role {
        self.source
    }

    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.response.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.response.body
    }

    pub fn into_parts(self) -> (Role, UpstreamResponse) {
        (self.source, self.response)
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("request finished without a final response")]
    Unresolved,
}

/// Write side of the final response. Consumed on write.
#[derive(Debug)]
pub struct ResponseWriter {
    tx: oneshot::Sender<FinalResponse>,
}

impl ResponseWriter {
    /// Create a writer and the receiver awaiting its single response.
    pub fn channel() -> (Self, oneshot::Receiver<FinalResponse>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Deliver the final response. A vanished caller is only logged.
    pub fn write(self, response: FinalResponse) {
        if self.tx.send(response).is_err() {
            tracing::debug!("Caller went away before the final response was written");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Received,
    Dispatched,
    Resolved,
}

/// Owns the lifecycle of inbound requests against a fixed upstream pair.
pub struct ProxyCoordinator {
    client: Arc<dyn UpstreamClient>,
    primary: Upstream,
    secondary: Upstream,
    observer: Arc<dyn AttemptObserver>,
}

impl ProxyCoordinator {
    /// Create a coordinator that records attempts through [`UpstreamMetrics`].
    pub fn new(client: Arc<dyn UpstreamClient>, primary: Upstream, secondary: Upstream) -> Self {
        Self {
            client,
            primary,
            secondary,
            observer: Arc::new(UpstreamMetrics),
        }
    }

    /// Replace the observer notified about every attempt.
    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run `request` in its own task and wait for the final response.
    ///
    /// The task keeps running if this future is dropped.
    pub async fn dispatch(
        self: &Arc<Self>,
        request: InboundRequest,
    ) -> Result<FinalResponse, CoordinatorError> {
        let (writer, rx) = ResponseWriter::channel();
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.run(request, writer).await });
        rx.await.map_err(|_| CoordinatorError::Unresolved)
    }

    /// Drive `request` to completion, writing the final response once.
    ///
    /// Returns after every attempt it started has resolved.
    pub async fn run(&self, request: InboundRequest, writer: ResponseWriter) {
        let policy = DispatchPolicy::for_method(&request.method);
        tracing::debug!(
            phase = ?Phase::Received,
            policy = %policy,
            method = %request.method,
            path = %request.path,
            body_bytes = request.body.len(),
            "Request buffered"
        );

        let request = Arc::new(request);
        match policy {
            DispatchPolicy::Failover => self.failover(request, writer).await,
            DispatchPolicy::DualSend => self.dual_send(request, writer).await,
        }
    }

    async fn failover(&self, request: Arc<InboundRequest>, writer: ResponseWriter) {
        tracing::debug!(phase = ?Phase::Dispatched, upstream = %self.primary, "Dispatching");
        let primary = self.attempt(&self.primary, &request).await;
        if primary.is_success() {
            return self.resolve(writer, primary.into_final());
        }

        tracing::warn!(
            status = %primary.outcome().response().status,
            secondary = %self.secondary,
            "Primary failed, failing over to secondary"
        );
        let secondary = self.attempt(&self.secondary, &request).await;
        if secondary.is_success() {
            return self.resolve(writer, secondary.into_final());
        }

        tracing::warn!(
            primary_status = %primary.outcome().response().status,
            secondary_status = %secondary.outcome().response().status,
            "Both upstreams failed, relaying primary's response"
        );
        let response = primary.write_response(|target, response| {
            FinalResponse::new(target.role(), response.clone())
        });
        self.resolve(writer, response);
    }

    async fn dual_send(&self, request: Arc<InboundRequest>, writer: ResponseWriter) {
        tracing::debug!(
            phase = ?Phase::Dispatched,
            primary = %self.primary,
            secondary = %self.secondary,
            "Dispatching to both upstreams"
        );

        let shadow = {
            let attempt = UpstreamAttempt::new(self.secondary.clone(), Arc::clone(&request));
            let client = Arc::clone(&self.client);
            let observer = Arc::clone(&self.observer);
            tokio::spawn(async move { attempt.send(&*client, &*observer).await })
        };

        let primary = self.attempt(&self.primary, &request).await;
        self.resolve(writer, primary.into_final());

        match shadow.await {
            Ok(resolved) => tracing::debug!(
                status = %resolved.outcome().response().status,
                success = resolved.is_success(),
                "Shadow write finished"
            ),
            Err(e) => tracing::error!(error = %e, "Shadow write task failed"),
        }
    }

    async fn attempt(
        &self,
        target: &Upstream,
        request: &Arc<InboundRequest>,
    ) -> ResolvedAttempt {
        UpstreamAttempt::new(target.clone(), Arc::clone(request))
            .send(&*self.client, &*self.observer)
            .await
    }

    fn resolve(&self, writer: ResponseWriter, response: FinalResponse) {
        tracing::debug!(
            phase = ?Phase::Resolved,
            source = %response.source(),
            status = %response.status(),
            "Writing final response"
        );
        writer.write(response);
    }
}
