//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by method, status
//! - `api_request_duration_seconds` (histogram): latency distribution
//! - `api_rate_limited_total` (counter): rejected admissions
//! - `api_auth_failures_total` (counter): rejected credentials by reason
//! - `api_validation_failures_total` (counter): rejected bodies by route
//! - `api_rate_windows` (gauge): tracked caller addresses
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!("api_requests_total", "method" => method.clone(), "status" => status.clone()).increment(1);
    histogram!("api_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("api_rate_limited_total").increment(1);
}

pub fn record_auth_failure(reason: &'static str) {
    counter!("api_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_validation_failure(route: &'static str) {
    counter!("api_validation_failures_total", "route" => route).increment(1);
}

pub fn record_rate_windows(count: usize) {
    gauge!("api_rate_windows").set(count as f64);
}
