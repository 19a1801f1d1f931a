//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by cache status and HTTP status
//! - `proxy_request_duration_seconds` (histogram): latency by cache status
//! - `proxy_origin_fetch_duration_seconds` (histogram): origin latency by outcome
//! - `proxy_cache_read_failures_total` (counter): store lookups/downloads that failed
//! - `proxy_cache_write_failures_total` (counter): cache population failures
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are low-cardinality: never paths or keys

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(cache_status: &'static str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "cache_status" => cache_status,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "cache_status" => cache_status)
        .record(start.elapsed().as_secs_f64());
}

/// Record an origin fetch.
pub fn record_origin_fetch(outcome: &'static str, start: Instant) {
    histogram!("proxy_origin_fetch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_read_failure() {
    counter!("proxy_cache_read_failures_total").increment(1);
}

pub fn record_cache_write_failure() {
    counter!("proxy_cache_write_failures_total").increment(1);
}
