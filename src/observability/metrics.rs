//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_total` (counter): admitted requests by status
//! - `gate_rate_limited_total` (counter): requests rejected with 429
//! - `gate_process_time_seconds` (histogram): downstream processing time

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record an admitted request and how long the downstream took.
pub fn record_request(status: u16, elapsed: Duration) {
    counter!("gate_requests_total", "status" => status.to_string()).increment(1);
    histogram!("gate_process_time_seconds").record(elapsed.as_secs_f64());
}

/// Record a request turned away by admission control.
pub fn record_rate_limited() {
    counter!("gate_rate_limited_total").increment(1);
}
