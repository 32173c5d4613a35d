//! Prometheus metrics for tournament activity.
//!
//! Metrics are recorded through the `metrics` facade and exported only when
//! [`init_metrics`] has installed the Prometheus exporter; otherwise every
//! call is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bracket_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/tournaments", 201);
//! metrics::participants_joined_total();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

pub fn tournaments_created_total() {
    metrics::counter!("tournaments_created_total").increment(1);
}

pub fn participants_joined_total() {
    metrics::counter!("participants_joined_total").increment(1);
}

pub fn tournaments_started_total() {
    metrics::counter!("tournaments_started_total").increment(1);
}

pub fn scores_reported_total() {
    metrics::counter!("scores_reported_total").increment(1);
}

/// Increment settled tournaments counter.
pub fn tournaments_settled_total() {
    metrics::counter!("tournaments_settled_total").increment(1);
}

/// Increment rejected operations counter, labelled by error kind.
pub fn operations_rejected_total(kind: &str) {
    metrics::counter!("operations_rejected_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}
