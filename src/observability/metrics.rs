//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pix_watch_checks_total` (counter): status checks by outcome
//! - `pix_watch_sessions_started_total` (counter): watch sessions started
//! - `pix_watch_approvals_total` (counter): approval notifications emitted
//!
//! Without an installed recorder every call is a no-op.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its HTTP listener.
/// Must be called within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_check(outcome: &'static str) {
    ::metrics::counter!("pix_watch_checks_total", "outcome" => outcome).increment(1);
}

pub fn record_session_started() {
    ::metrics::counter!("pix_watch_sessions_started_total").increment(1);
}

pub fn record_approval() {
    ::metrics::counter!("pix_watch_approvals_total").increment(1);
}
