//! Metrics collection and exposition.
//!
//! # Metrics
//! - `route_cloak_decisions_total` (counter): middleware outcomes by
//!   `outcome` (rewrite, redirect, pass_through) and pass-through `reason`
//! - `route_cloak_upstream_requests_total` (counter): forwarded requests
//!   by status
//! - `route_cloak_upstream_duration_seconds` (histogram): upstream latency
//!
//! # Design Decisions
//! - Low-overhead metric updates through the `metrics` facade
//! - Prometheus exporter only when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one middleware decision.
pub fn record_decision(outcome: &'static str, reason: &'static str) {
    metrics::counter!(
        "route_cloak_decisions_total",
        "outcome" => outcome,
        "reason" => reason
    )
    .increment(1);
}

/// Record one forwarded request.
pub fn record_upstream(status: u16, start: Instant) {
    metrics::counter!("route_cloak_upstream_requests_total", "status" => status.to_string())
        .increment(1);
    metrics::histogram!("route_cloak_upstream_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}
