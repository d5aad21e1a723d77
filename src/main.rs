//! route-cloak gateway
//!
//! Fronts a web application and keeps the first two segments of its page
//! routes obfuscated on the wire.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                  ROUTE-CLOAK                     │
//!                       │                                                  │
//!   GET /publisher/x    │  ┌─────────┐   ┌──────────────┐                  │
//!   ────────────────────┼─▶│ http    │──▶│ cloak        │── 307 + marker ──┼──▶ client
//!                       │  │ server  │   │ middleware   │                  │
//!   GET /<token>/rest   │  └─────────┘   └──────┬───────┘                  │
//!   ────────────────────┼──────────────────────▶│ rewrite to plaintext     │
//!                       │                       ▼                          │
//!                       │                ┌──────────────┐                  │
//!                       │                │ forward to   │──────────────────┼──▶ upstream app
//!                       │                │ upstream     │                  │
//!                       │                └──────────────┘                  │
//!                       │  config · obfuscation · observability · lifecycle│
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! Configuration file: `ROUTE_CLOAK_CONFIG` (TOML). Key: `ROUTE_ENCRYPTION_KEY`.

use std::path::PathBuf;

use route_cloak::http::{GatewayServer, ServerError};
use route_cloak::lifecycle::{bootstrap, load_startup_config, signals, Shutdown};
use route_cloak::observability::{logging, metrics};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var_os("ROUTE_CLOAK_CONFIG").map(PathBuf::from);

    // The subscriber depends on the config, so load failures go to stderr.
    let config = match load_startup_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("route-cloak: startup failed: {e}");
            return Err(e.into());
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("route-cloak: logging already initialized: {e}");
    }

    tracing::info!(
        config = ?config_path,
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        tls = config.listener.tls.is_some(),
        "route-cloak v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let boot = match bootstrap(config) {
        Ok(boot) => boot,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    if boot.config.observability.metrics_enabled {
        match boot.config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %boot.config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let use_tls = boot.config.listener.tls.is_some();
    let bind_address = boot.config.listener.bind_address.clone();
    let server = GatewayServer::new(boot.config, boot.cloak)?;

    let mut server_task = tokio::spawn(serve(server, use_tls, bind_address, server_shutdown));

    tokio::select! {
        result = &mut server_task => {
            result??;
        }
        _ = signals::shutdown_on_signal(&shutdown) => {
            tracing::info!("Waiting for in-flight requests");
            server_task.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(
    server: GatewayServer,
    use_tls: bool,
    bind_address: String,
    shutdown: tokio::sync::broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    if use_tls {
        return server.run_tls(shutdown).await;
    }
    let listener = TcpListener::bind(&bind_address).await?;
    server.run(listener, shutdown).await
}
