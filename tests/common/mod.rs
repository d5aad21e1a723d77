//! Shared utilities for gateway integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::Request, Router};
use route_cloak::config::GatewayConfig;
use route_cloak::obfuscation::{KeySource, SecretKey};
use route_cloak::{GatewayServer, RouteCloak, Shutdown};
use tokio::net::TcpListener;

pub const TEST_KEY: &str = "your-secret-key-here-change-me-in-production";
pub const MARKER: &str = "x-route-cloak-redirected";

/// Start an upstream that echoes what it received.
///
/// Body: `<path and query>|<x-route-cloak-original-path>|<x-forwarded-proto>`.
pub async fn start_echo_upstream() -> SocketAddr {
    let app = Router::new().fallback(|req: Request| async move {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        format!(
            "{}|{}|{}",
            req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/"),
            header("x-route-cloak-original-path"),
            header("x-forwarded-proto"),
        )
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a gateway in front of `upstream`. Keep the returned `Shutdown` alive.
#[allow(dead_code)]
pub async fn start_gateway(upstream: SocketAddr) -> (SocketAddr, Shutdown) {
    let mut config = GatewayConfig::default();
    config.upstream.address = upstream.to_string();
    start_gateway_with(config).await
}

pub async fn start_gateway_with(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let key = SecretKey::new(TEST_KEY, KeySource::Configured).unwrap();
    let cloak = RouteCloak::from_config(&config.cloak, key);
    let server = GatewayServer::new(config, cloak).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

/// Client that never follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
