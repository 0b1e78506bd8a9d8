//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, request deadline)
//! - Emit the stats signal for every inbound request
//! - Buffer the inbound request and hand it to the coordinator
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{buffer_request, request_id, MakeRequestUuid};
use crate::http::response::internal_error;
use crate::proxy::ProxyCoordinator;
use crate::stats::StatsEmitter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ProxyCoordinator>,
    pub stats: StatsEmitter,
}

/// HTTP server for the blue-green proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server relaying through `coordinator`.
    pub fn new(config: &ProxyConfig, coordinator: Arc<ProxyCoordinator>, stats: StatsEmitter) -> Self {
        let state = AppState { coordinator, stats };
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// A request that outlives `timeouts.request_secs` gets the same bare 500
    /// as any other request the coordinator could not answer.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        config.timeouts.request(),
                    )),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Buffers the request, dispatches it to the upstream pair and relays the
/// final response.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    state.stats.emit();

    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();

    let inbound = match buffer_request(request).await {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::warn!(request_id = %request_id, peer = %peer, error = %e, "Failed to read request body");
            return internal_error();
        }
    };
    let method = inbound.method.clone();
    let path = inbound.path.clone();

    match state.coordinator.dispatch(inbound).await {
        Ok(final_response) => {
            tracing::info!(
                request_id = %request_id,
                peer = %peer,
                method = %method,
                path = %path,
                status = final_response.status().as_u16(),
                upstream = %final_response.source(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Request proxied"
            );
            final_response.into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, method = %method, path = %path, error = %e, "No final response");
            internal_error()
        }
    }
}
