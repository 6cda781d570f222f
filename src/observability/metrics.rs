//! Metrics collection and exposition.
//!
//! # Metrics
//! - `template_renders_total` (counter): renders by registry source and status
//! - `template_render_duration_seconds` (histogram): render latency
//!
//! Without an installed exporter the macros are no-ops.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one top-level render.
pub fn record_render(kind: &'static str, status: u16, start: Instant) {
    metrics::counter!("template_renders_total", "source" => kind, "status" => status.to_string())
        .increment(1);
    metrics::histogram!("template_render_duration_seconds", "source" => kind)
        .record(start.elapsed().as_secs_f64());
}
