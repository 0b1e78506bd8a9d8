//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → config file (TOML, optional)
//!     → CLI flags / environment (PRIMARY_HOST, SECONDARY_HOST, PORT)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigOverrides};
pub use schema::{
    ListenerConfig, ObservabilityConfig, ProxyConfig, StatsConfig, TimeoutConfig, UpstreamsConfig,
};
pub use validation::ValidationError;
