//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Initialize subsystems in dependency order
//! - Start the statistician before any connection is accepted
//! - Bind the listener last (traffic only when ready)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal

use std::net::AddrParseError;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics::init_metrics;
use crate::proxy::{HyperUpstreamClient, ProxyCoordinator, Role, Upstream, UpstreamParseError};
use crate::stats::{stats_channel, Statistician, StatsEmitter};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamParseError),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything needed to start serving.
pub struct Started {
    pub server: HttpServer,
    pub listener: TcpListener,
    /// Statistician task, when stats are enabled. Resolves to the total
    /// number of requests counted.
    pub statistician: Option<JoinHandle<u64>>,
}

/// Bring up every subsystem and bind the listener.
pub async fn start(config: ProxyConfig, shutdown: &Shutdown) -> Result<Started, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let (stats, statistician) = if config.stats.enabled {
        let (emitter, signals) = stats_channel(config.stats.channel_capacity);
        let statistician = Statistician::new(config.stats.window(), signals);
        let handle = tokio::spawn(statistician.run(shutdown.subscribe()));
        (emitter, Some(handle))
    } else {
        tracing::info!("Stats reporting disabled");
        (StatsEmitter::disabled(), None)
    };

    let primary = Upstream::parse(Role::Primary, &config.upstreams.primary)?;
    let secondary = Upstream::parse(Role::Secondary, &config.upstreams.secondary)?;
    tracing::info!(primary = %primary, secondary = %secondary, "Upstreams configured");

    let client = Arc::new(HyperUpstreamClient::new(
        config.timeouts.connect(),
        config.timeouts.upstream(),
    ));
    tracing::info!(
        attempt_timeout = ?client.timeout(),
        request_timeout = ?config.timeouts.request(),
        "Upstream client ready"
    );
    let coordinator = Arc::new(ProxyCoordinator::new(client, primary, secondary));

    let address = config.listener.bind_address();
    let server = HttpServer::new(&config, coordinator, stats);

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listening for connections");
    }

    Ok(Started {
        server,
        listener,
        statistician,
    })
}
