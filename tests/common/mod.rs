//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use blue_green_proxy::config::ProxyConfig;
use blue_green_proxy::http::HttpServer;
use blue_green_proxy::lifecycle::{self, Shutdown, Started};
use blue_green_proxy::proxy::{HyperUpstreamClient, ProxyCoordinator, Role, Upstream};
use blue_green_proxy::stats::StatsEmitter;

/// A request as seen by a mock upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A mock upstream answering every request with a fixed status and body.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockUpstream {
    pub fn uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until the upstream has seen `expected` requests.
    pub async fn wait_for_hits(&self, expected: usize) {
        wait_until(|| self.hits() >= expected).await;
    }
}

/// Start a mock upstream on an ephemeral port. Every response carries an
/// `x-upstream: <name>` header.
pub async fn start_upstream(name: &'static str, status: u16, reply: &'static str) -> MockUpstream {
    start_slow_upstream(name, Duration::ZERO, status, reply).await
}

/// Like [`start_upstream`], but every response is held back for `delay`.
pub async fn start_slow_upstream(
    name: &'static str,
    delay: Duration,
    status: u16,
    reply: &'static str,
) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let status = StatusCode::from_u16(status).unwrap();

    let (h, r) = (hits.clone(), requests.clone());
    let app = Router::new().fallback(move |request: Request<Body>| {
        let (hits, requests) = (h.clone(), r.clone());
        async move {
            let (parts, body) = request.into_parts();
            let body = to_bytes(body, usize::MAX).await.unwrap();
            let path = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".into());
            requests.lock().unwrap().push(Recorded {
                method: parts.method,
                path,
                headers: parts.headers,
                body,
            });
            hits.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            (status, [("x-upstream", name)], reply)
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream {
        addr,
        hits,
        requests,
    }
}

/// Start a raw TCP upstream that promises a body it never finishes sending.
pub async fn start_truncating_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing is listening on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A running proxy under test.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Loopback config on an ephemeral port with short upstream deadlines.
pub fn test_config(primary: &str, secondary: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.upstreams.primary = primary.into();
    config.upstreams.secondary = secondary.into();
    config.timeouts.connect_secs = 2;
    config.timeouts.upstream_secs = 5;
    config
}

/// Start the proxy on an ephemeral port in front of the given upstreams.
pub async fn start_proxy(primary: &str, secondary: &str) -> TestProxy {
    let config = test_config(primary, secondary);

    let shutdown = Shutdown::new();
    let Started {
        server, listener, ..
    } = lifecycle::start(config, &shutdown).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

/// Serve `config` directly through [`HttpServer`], skipping validation and
/// the statistician. The caller owns the receiving end of `stats`.
pub async fn serve(config: &ProxyConfig, stats: StatsEmitter) -> TestProxy {
    let primary = Upstream::parse(Role::Primary, &config.upstreams.primary).unwrap();
    let secondary = Upstream::parse(Role::Secondary, &config.upstreams.secondary).unwrap();
    let client = Arc::new(HyperUpstreamClient::new(
        config.timeouts.connect(),
        config.timeouts.upstream(),
    ));
    let coordinator = Arc::new(ProxyCoordinator::new(client, primary, secondary));
    let server = HttpServer::new(config, coordinator, stats);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

/// A client that bypasses any system proxy and never pools connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll a condition until it holds, giving up after a few seconds.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
