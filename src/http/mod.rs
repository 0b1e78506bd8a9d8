//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, stats signal)
//!     → request.rs (request ID, buffer full body → InboundRequest)
//!     → proxy::ProxyCoordinator (dispatch to primary/secondary)
//!     → response.rs (FinalResponse → caller)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
