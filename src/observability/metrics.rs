//! Metrics collection and exposition.
//!
//! # Metrics
//! - `route_requests_total` (counter): requests by endpoint and status
//! - `route_request_duration_seconds` (histogram): latency by endpoint
//! - `route_decode_failures_total` (counter): rejected inputs by endpoint
//!
//! # Design Decisions
//! - Labels use the canonical endpoint key, never the raw URI
//! - Every request is recorded exactly once, including 499s

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(endpoint: &str, status: u16, started: Instant) {
    metrics::counter!(
        "route_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "route_request_duration_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_decode_failure(endpoint: &str) {
    metrics::counter!("route_decode_failures_total", "endpoint" => endpoint.to_string()).increment(1);
}
