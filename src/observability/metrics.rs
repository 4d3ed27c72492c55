//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, cache, rate limiting, origin)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): responses by status code
//! - `proxy_request_duration_seconds` (histogram): per-connection latency
//! - `proxy_cache_lookups_total` (counter): lookups by result (hit/miss)
//! - `proxy_cache_evictions_total` (counter)
//! - `proxy_rate_limited_total` (counter)
//! - `proxy_upstream_fetch_total` (counter): origin fetches by outcome
//! - `proxy_upstream_fetch_duration_seconds` (histogram)
//! - `proxy_active_connections` (gauge): admitted connections in flight
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request with its response status.
pub fn record_request(status: u16, start: Instant) {
    ::metrics::counter!("proxy_requests_total", "status" => status.to_string()).increment(1);
    ::metrics::histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!("proxy_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_eviction() {
    ::metrics::counter!("proxy_cache_evictions_total").increment(1);
}

pub fn record_rate_limited() {
    ::metrics::counter!("proxy_rate_limited_total").increment(1);
}

/// Record an origin fetch; `outcome` is "ok" or a short failure reason.
pub fn record_upstream_fetch(outcome: &'static str, start: Instant) {
    ::metrics::counter!("proxy_upstream_fetch_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("proxy_upstream_fetch_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_connection_opened() {
    ::metrics::gauge!("proxy_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    ::metrics::gauge!("proxy_active_connections").decrement(1.0);
}
