//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Wrap it in the route obfuscation middleware (before routing)
//! - Wire up middleware (tracing, request ID, timeout, body limit)
//! - Bind server to a plain or TLS listener
//! - Forward plaintext requests to the upstream application

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::middleware::{cloak_router, CloakState, CloakStateError, CloakedPath};
use crate::http::request::{request_id_of, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::shutdown::recv_shutdown;
use crate::net::load_tls_config;
use crate::observability::metrics;
use crate::routing::RouteCloak;
use crate::security::headers::{prepare_upstream_headers, strip_hop_by_hop};

/// How long TLS connections may drain after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid upstream address '{0}'")]
    Upstream(String),

    #[error(transparent)]
    Cloak(#[from] CloakStateError),

    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("TLS is not configured")]
    TlsNotConfigured,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// State injected into the forwarding handler.
#[derive(Clone)]
pub struct ForwardState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
    pub forwarded_proto: &'static str,
}

/// HTTP gateway fronting the upstream application.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a new gateway from validated configuration.
    pub fn new(config: GatewayConfig, cloak: RouteCloak) -> Result<Self, ServerError> {
        let upstream = Authority::from_str(&config.upstream.address)
            .map_err(|_| ServerError::Upstream(config.upstream.address.clone()))?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.upstream.connect_timeout_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let forward = ForwardState {
            client,
            upstream,
            forwarded_proto: if config.listener.tls.is_some() { "https" } else { "http" },
        };
        let cloak_state = CloakState::from_config(&config.cloak, cloak)?;

        let router = Self::build_router(&config, forward, cloak_state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, forward: ForwardState, cloak_state: CloakState) -> Router {
        let inner = Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .with_state(forward);

        cloak_router(inner, cloak_state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, upstream = %self.config.upstream.address, "HTTP gateway starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(recv_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP gateway stopped");
        Ok(())
    }

    /// Run the server with TLS on the configured bind address until `shutdown` fires.
    pub async fn run_tls(self, shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let tls = self.config.listener.tls.as_ref().ok_or(ServerError::TlsNotConfigured)?;
        let rustls = load_tls_config(tls).await?;
        let addr: SocketAddr = self
            .config
            .listener
            .bind_address
            .parse()
            .map_err(|_| ServerError::BindAddress(self.config.listener.bind_address.clone()))?;

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            recv_shutdown(shutdown).await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        tracing::info!(address = %addr, upstream = %self.config.upstream.address, "HTTPS gateway starting");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS gateway stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Forward a (possibly rewritten) request to the upstream.
async fn forward_handler(State(state): State<ForwardState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id_of(&request);
    let original_path = request
        .extensions()
        .get::<CloakedPath>()
        .map(|c| c.as_str().to_owned());

    let (mut parts, body) = request.into_parts();

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        "Forwarding request"
    );

    let Some(uri) = upstream_uri(&parts.uri, &state.upstream) else {
        tracing::warn!(request_id = %request_id, uri = %parts.uri, "Cannot build upstream URI");
        return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
    };
    parts.uri = uri;
    parts.version = Version::HTTP_11;
    prepare_upstream_headers(&mut parts.headers, state.forwarded_proto, original_path.as_deref());

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16(), start_time);
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Point `uri` at the upstream, keeping path and query.
fn upstream_uri(uri: &Uri, upstream: &Authority) -> Option<Uri> {
    let mut parts = uri.clone().into_parts();
    parts.scheme = Some(Scheme::HTTP);
    parts.authority = Some(upstream.clone());
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    Uri::from_parts(parts).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_uri() {
        let upstream = Authority::from_static("127.0.0.1:3000");
        let uri: Uri = "/publisher/dashboard?tab=OverView".parse().unwrap();
        assert_eq!(
            upstream_uri(&uri, &upstream).unwrap().to_string(),
            "http://127.0.0.1:3000/publisher/dashboard?tab=OverView"
        );
    }

    #[test]
    fn test_invalid_upstream_rejected() {
        let mut config = GatewayConfig::default();
        config.upstream.address = "not a host".into();
        let key = crate::obfuscation::SecretKey::fallback();
        let cloak = RouteCloak::from_config(&config.cloak, key);
        assert!(matches!(
            GatewayServer::new(config, cloak),
            Err(ServerError::Upstream(_))
        ));
    }
}
