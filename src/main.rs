//! Blue-green deployment proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                 BLUE-GREEN PROXY                 │
//!                        │                                                  │
//!   Client Request       │  ┌────────┐   ┌────────────┐   ┌─────────────┐   │
//!   ─────────────────────┼─▶│  http  │──▶│   policy   │──▶│ coordinator │───┼──▶ primary
//!                        │  │ server │   │ (by method)│   │             │───┼──▶ secondary
//!                        │  └───┬────┘   └────────────┘   └──────┬──────┘   │
//!   Client Response      │      │                               │          │
//!   ◀────────────────────┼──────┴──────── final response ◀──────┘          │
//!                        │      │                                           │
//!                        │      ▼ stats signal                              │
//!                        │  ┌──────────────┐                                │
//!                        │  │ statistician │ (throughput log every window)  │
//!                        │  └──────────────┘                                │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use blue_green_proxy::config::{load_config, ConfigOverrides};
use blue_green_proxy::lifecycle::{self, signals::wait_for_shutdown_signal, Shutdown, Started};
use blue_green_proxy::observability::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "blue-green-proxy", version)]
#[command(about = "Relays HTTP traffic to a primary and a secondary upstream", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "BLUE_GREEN_CONFIG")]
    config: Option<PathBuf>,

    /// Primary upstream URI, e.g. http://10.0.0.1:8080.
    #[arg(long, env = "PRIMARY_HOST")]
    primary: Option<String>,

    /// Secondary upstream URI, e.g. http://10.0.0.2:8080.
    #[arg(long, env = "SECONDARY_HOST")]
    secondary: Option<String>,

    /// Port to listen on (default 8090).
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(
        cli.config.as_deref(),
        ConfigOverrides {
            primary: cli.primary,
            secondary: cli.secondary,
            port: cli.port,
        },
    )?;

    init_logging(&config.observability);

    tracing::info!("blue-green-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        port = config.listener.port,
        primary = %config.upstreams.primary,
        secondary = %config.upstreams.secondary,
        stats_window_secs = config.stats.window_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let Started {
        server,
        listener,
        statistician,
    } = lifecycle::start(config, &shutdown).await?;

    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        _ = wait_for_shutdown_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
        result = &mut server_task => {
            shutdown.trigger();
            result??;
        }
    }

    if let Some(statistician) = statistician {
        statistician.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
