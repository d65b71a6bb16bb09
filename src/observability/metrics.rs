//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_frames_total` (counter): frames by direction (in/out)
//! - `gateway_frames_dropped_total` (counter): malformed frames dropped
//! - `gateway_dispatches_total` (counter): handler dispatches by kind
//! - `gateway_api_requests_total` (counter): outbound API requests

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Failure to install is logged
/// and metrics stay no-op; the gateway runs on regardless.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(error) => tracing::error!(%error, "failed to install metrics exporter"),
    }
}

pub fn record_frame_in() {
    counter!("gateway_frames_total", "direction" => "in").increment(1);
}

pub fn record_frame_out() {
    counter!("gateway_frames_total", "direction" => "out").increment(1);
}

pub fn record_frame_dropped() {
    counter!("gateway_frames_dropped_total").increment(1);
}

pub fn record_dispatch(kind: &'static str) {
    counter!("gateway_dispatches_total", "kind" => kind).increment(1);
}

pub fn record_api_request() {
    counter!("gateway_api_requests_total").increment(1);
}
