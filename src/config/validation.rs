//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check both upstream URIs resolve to usable targets
//! - Validate value ranges (timeouts > 0, stats window > 0)
//! - The inbound deadline must outlast a full failover (two upstream attempts)
//! - Port 0 is accepted and binds an ephemeral port
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::proxy::upstream::{Role, Upstream, UpstreamParseError};

/// A single semantic problem in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0} upstream is not configured")]
    MissingUpstream(Role),

    #[error("{role} upstream: {source}")]
    InvalidUpstream {
        role: Role,
        #[source]
        source: UpstreamParseError,
    },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error(
        "timeouts.request_secs ({request_secs}) must be at least twice \
         timeouts.upstream_secs ({upstream_secs})"
    )]
    RequestDeadlineTooShort { request_secs: u64, upstream_secs: u64 },

    #[error("stats.{0} must be greater than zero")]
    ZeroStatsSetting(&'static str),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (role, uri) in [
        (Role::Primary, &config.upstreams.primary),
        (Role::Secondary, &config.upstreams.secondary),
    ] {
        if uri.trim().is_empty() {
            errors.push(ValidationError::MissingUpstream(role));
        } else if let Err(source) = Upstream::parse(role, uri) {
            errors.push(ValidationError::InvalidUpstream { role, source });
        }
    }

    for (name, value) in [
        ("connect_secs", config.timeouts.connect_secs),
        ("upstream_secs", config.timeouts.upstream_secs),
        ("request_secs", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    let timeouts = &config.timeouts;
    if timeouts.request_secs > 0 && timeouts.request_secs < timeouts.upstream_secs.saturating_mul(2) {
        errors.push(ValidationError::RequestDeadlineTooShort {
            request_secs: timeouts.request_secs,
            upstream_secs: timeouts.upstream_secs,
        });
    }

    if config.stats.enabled {
        if config.stats.window_secs == 0 {
            errors.push(ValidationError::ZeroStatsSetting("window_secs"));
        }
        if config.stats.channel_capacity == 0 {
            errors.push(ValidationError::ZeroStatsSetting("channel_capacity"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
