//! Blue-green dispatch core.
//!
//! # Data Flow
//! ```text
//! InboundRequest (buffered once, shared via Arc)
//!     → policy.rs (method → Failover | DualSend)
//!     → coordinator.rs (schedules attempts, owns the response writer)
//!     → upstream.rs (one attempt per target, classify, notify observer)
//!     → client.rs (hyper transport, body.rs buffers the response)
//!     → FinalResponse
//! ```

pub mod body;
pub mod client;
pub mod coordinator;
pub mod headers;
pub mod policy;
pub mod request;
pub mod upstream;

#[cfg(test)]
mod testing;

pub use client::{HyperUpstreamClient, TransportError, UpstreamClient};
pub use coordinator::{CoordinatorError, FinalResponse, ProxyCoordinator, ResponseWriter};
pub use policy::DispatchPolicy;
pub use request::InboundRequest;
pub use upstream::{
    AttemptObserver, FailureCause, NoopObserver, Outcome, ResolvedAttempt, Role, Upstream,
    UpstreamAttempt, UpstreamParseError, UpstreamResponse,
};
