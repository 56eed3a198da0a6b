//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
#[must_use]
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across crates.

/// Relay sessions started (counter).
pub const RELAY_SESSIONS_TOTAL: &str = "relay_sessions_total";
/// Relay sessions currently forwarding or connecting (gauge).
pub const RELAY_SESSIONS_ACTIVE: &str = "relay_sessions_active";
/// Bytes forwarded (counter, labels: direction = up|down).
pub const RELAY_BYTES_TOTAL: &str = "relay_bytes_total";
/// Backend connect failures (counter).
pub const RELAY_CONNECT_FAILURES_TOTAL: &str = "relay_connect_failures_total";
