//! `/health` endpoint.

use std::time::Instant;

use periscope_settings::GatewaySettings;
use serde::Serialize;

/// The two ways into the desktop, reported for the landing page's benefit.
#[derive(Debug, Clone, Serialize)]
pub struct VncPorts {
    /// Raw VNC TCP port.
    pub direct: u16,
    /// noVNC web client port.
    pub web: u16,
}

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` when the server is running.
    pub status: String,
    /// Display name of the exposed service.
    pub service: String,
    /// Connection identifier.
    pub connection: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Number of live relay sessions.
    pub active_sessions: usize,
    /// Advertised VNC ports.
    pub vnc_ports: VncPorts,
}

/// Build a health response from live counters.
pub fn health_check(
    settings: &GatewaySettings,
    start_time: Instant,
    active_sessions: usize,
) -> HealthResponse {
    HealthResponse {
        status: "healthy".into(),
        service: settings.service_name(),
        connection: settings.service.connection_name.clone(),
        uptime_secs: start_time.elapsed().as_secs(),
        active_sessions,
        vnc_ports: VncPorts {
            direct: settings.relay.vnc_port,
            web: settings.server.novnc_port,
        },
    }
}
