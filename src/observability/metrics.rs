//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): inbound requests seen by the statistician
//! - `proxy_requests_per_second` (gauge): rate over the last stats window
//! - `proxy_upstream_attempts_total` (counter): attempts by upstream, outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and off by default

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::proxy::upstream::{AttemptObserver, FailureCause, Upstream, UpstreamResponse};

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Default attempt observer: logs failures and counts outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UpstreamMetrics;

impl AttemptObserver for UpstreamMetrics {
    fn on_success(&self, target: &Upstream, _response: &UpstreamResponse) {
        metrics::counter!(
            "proxy_upstream_attempts_total",
            "upstream" => target.role().as_str(),
            "outcome" => "success"
        )
        .increment(1);
    }

    fn on_failure(&self, target: &Upstream, response: &UpstreamResponse, cause: &FailureCause) {
        let outcome = match cause {
            FailureCause::Status(_) => "status",
            FailureCause::Transport(_) => "transport",
        };
        metrics::counter!(
            "proxy_upstream_attempts_total",
            "upstream" => target.role().as_str(),
            "outcome" => outcome
        )
        .increment(1);

        tracing::warn!(
            upstream = %target,
            status = %response.status,
            cause = ?cause,
            "Upstream attempt failed"
        );
    }
}
