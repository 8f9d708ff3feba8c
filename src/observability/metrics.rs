//! Metrics collection and exposition.
//!
//! # Metrics
//! - `devproxy_requests_total` (counter): requests by backend kind and status
//! - `devproxy_request_duration_seconds` (histogram): end-to-end latency
//! - `devproxy_rule_reloads_total` (counter): rule table reloads by kind and outcome
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: no paths, no rule text

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter"),
    }
}

pub fn record_request(backend: &'static str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "devproxy_requests_total",
        "backend" => backend,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("devproxy_request_duration_seconds", "backend" => backend)
        .record(elapsed.as_secs_f64());
}

pub fn record_rule_reload(kind: &'static str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!("devproxy_rule_reloads_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}
