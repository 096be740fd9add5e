//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gopher_responses_total` (counter): dispatches by outcome
//! - `gopher_dispatch_duration_seconds` (histogram): handler + encoding time
//! - `gopher_connections_total` (counter): accepted connections by transport
//! - `gopher_active_connections` (gauge): open connections by transport
//! - `gopher_quic_streams_total` (counter): QUIC streams accepted

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome and latency of one dispatch.
pub fn record_dispatch(outcome: &'static str, started: Instant) {
    metrics::counter!("gopher_responses_total", "outcome" => outcome).increment(1);
    metrics::histogram!("gopher_dispatch_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn connection_opened(transport: &'static str) {
    metrics::counter!("gopher_connections_total", "transport" => transport).increment(1);
    metrics::gauge!("gopher_active_connections", "transport" => transport).increment(1.0);
}

pub fn connection_closed(transport: &'static str) {
    metrics::gauge!("gopher_active_connections", "transport" => transport).decrement(1.0);
}

pub fn quic_stream_opened() {
    metrics::counter!("gopher_quic_streams_total").increment(1);
}
