//! Blue-green deployment HTTP proxy.
//!
//! Every inbound request is relayed to a primary and a secondary upstream.
//! Safe methods (GET, HEAD, OPTIONS) fail over from primary to secondary;
//! all other methods are sent to both, and the primary's answer is returned.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod stats;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::ProxyCoordinator;
