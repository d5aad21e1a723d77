//! Route obfuscation middleware.
//!
//! Applies [`RouteCloak`] to every request that is not excluded:
//! tokens are rewritten internally to their plaintext path, plain
//! obfuscated routes are redirected to their token, everything else is
//! served as received. Nothing in here ever produces an error response.

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::PathAndQuery, HeaderName, HeaderValue, Request, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::sync::Arc;
use tower::Layer;

use crate::config::CloakConfig;
use crate::observability::metrics;
use crate::routing::{ExclusionMatcher, Matcher, PassReason, RouteCloak, RouteDecision};

/// Visible (obfuscated) path and query of a request that was rewritten.
///
/// Inserted as a request extension so handlers can still see what the
/// client asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloakedPath(pub String);

impl CloakedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shared middleware state.
#[derive(Clone)]
pub struct CloakState {
    pub cloak: Arc<RouteCloak>,
    pub exclusions: Arc<ExclusionMatcher>,
    pub marker_header: HeaderName,
    pub redirect_status: StatusCode,
}

impl CloakState {
    pub fn new(cloak: RouteCloak, exclusions: ExclusionMatcher, marker_header: HeaderName) -> Self {
        Self {
            cloak: Arc::new(cloak),
            exclusions: Arc::new(exclusions),
            marker_header,
            redirect_status: StatusCode::TEMPORARY_REDIRECT,
        }
    }

    /// Build from validated configuration.
    pub fn from_config(config: &CloakConfig, cloak: RouteCloak) -> Result<Self, CloakStateError> {
        let marker_header = HeaderName::from_bytes(config.marker_header.as_bytes())
            .map_err(|_| CloakStateError::MarkerHeader(config.marker_header.clone()))?;
        let redirect_status = StatusCode::from_u16(config.redirect_status)
            .ok()
            .filter(StatusCode::is_redirection)
            .ok_or(CloakStateError::RedirectStatus(config.redirect_status))?;

        let mut state = Self::new(
            cloak,
            ExclusionMatcher::new(config.excluded_prefixes.iter().cloned()),
            marker_header,
        );
        state.redirect_status = redirect_status;
        Ok(state)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CloakStateError {
    #[error("invalid marker header name '{0}'")]
    MarkerHeader(String),

    #[error("{0} is not a redirect status")]
    RedirectStatus(u16),
}

/// Wrap `router` so the middleware runs before route matching.
///
/// Layers added with `Router::layer` only run after a route matched, which
/// is too late to rewrite the path, so the router becomes the fallback
/// service of an outer router instead.
pub fn cloak_router(router: Router, state: CloakState) -> Router {
    let cloaked = middleware::from_fn_with_state(state, route_cloak_middleware).layer(router);
    Router::new().fallback_service(cloaked)
}

pub async fn route_cloak_middleware(
    State(state): State<CloakState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // 1. Excluded prefixes never enter the state machine.
    if state.exclusions.matches(&req) {
        return next.run(req).await;
    }

    let path = req.uri().path().to_owned();

    // 2. Decide.
    let marker_present = req.headers().contains_key(&state.marker_header);
    let decision = state.cloak.decide(&path, req.uri().query(), marker_present);

    match decision {
        RouteDecision::Rewrite { path_and_query } => {
            let Some(uri) = rewrite_uri(req.uri(), &path_and_query) else {
                tracing::warn!(path = %path, "Decoded path is not a valid URI, serving as requested");
                metrics::record_decision("pass_through", PassReason::FailOpen.as_str());
                return next.run(req).await;
            };

            tracing::debug!(visible = %path, internal = %uri, "Rewriting obfuscated path");
            metrics::record_decision("rewrite", "");

            let visible = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_owned())
                .unwrap_or(path);
            req.extensions_mut().insert(CloakedPath(visible));
            *req.uri_mut() = uri;
            next.run(req).await
        }
        RouteDecision::Redirect { location } => {
            let Ok(location_value) = HeaderValue::from_str(&location) else {
                tracing::warn!(path = %path, "Obfuscated location is not a valid header, serving as requested");
                metrics::record_decision("pass_through", PassReason::FailOpen.as_str());
                return next.run(req).await;
            };

            tracing::debug!(path = %path, location = %location, "Redirecting to obfuscated path");
            metrics::record_decision("redirect", "");

            let mut response = Response::new(Body::empty());
            *response.status_mut() = state.redirect_status;
            response.headers_mut().insert(header::LOCATION, location_value);
            response
                .headers_mut()
                .insert(state.marker_header.clone(), HeaderValue::from_static("1"));
            response
        }
        RouteDecision::PassThrough { reason } => {
            tracing::trace!(path = %path, reason = reason.as_str(), "Passing request through");
            metrics::record_decision("pass_through", reason.as_str());
            next.run(req).await
        }
    }
}

/// Replace path and query, keeping scheme and authority if present.
fn rewrite_uri(original: &Uri, path_and_query: &str) -> Option<Uri> {
    let mut parts = original.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}
