//! Metrics collection and exposition.
//!
//! # Metrics
//! - `routedir_requests_total` (counter): requests by method, status
//! - `routedir_request_duration_seconds` (histogram): latency distribution
//! - `routedir_gate_admitted_total` (counter): requests held by the gate
//! - `routedir_gate_pending` (gauge): admitted requests still in flight
//! - `routedir_gate_retired` (gauge): 1 once the gate removed itself
//! - `routedir_routes_registered` (gauge): layers registered by the build
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - Prometheus exposition is opt-in via config

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [("method", method.to_string()), ("status", status.to_string())];
    counter!("routedir_requests_total", &labels).increment(1);
    histogram!("routedir_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_gate_admitted() {
    counter!("routedir_gate_admitted_total").increment(1);
}

pub fn set_gate_pending(pending: usize) {
    gauge!("routedir_gate_pending").set(pending as f64);
}

pub fn record_gate_retired() {
    gauge!("routedir_gate_retired").set(1.0);
}

pub fn record_routes_registered(registered: usize) {
    gauge!("routedir_routes_registered").set(registered as f64);
}
