//! `/status` endpoint — operator-facing report with a live backend probe.
//!
//! The original deployment checked its collaborators by scanning the process
//! table; here the relay is in-process, so the report covers what can still
//! go missing: the VNC backend itself (probed with a bounded TCP connect)
//! and the live session count.

use std::time::Duration;

use periscope_settings::GatewaySettings;
use serde::Serialize;
use tokio::net::TcpStream;

/// Bounded wait for the backend reachability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-collaborator reachability flags.
#[derive(Debug, Clone, Serialize)]
pub struct ServicesStatus {
    /// Whether the VNC backend accepted a TCP connection.
    pub vnc_backend: bool,
    /// The in-process relay; true whenever the server is answering.
    pub relay: bool,
}

/// Ports the deployment exposes.
#[derive(Debug, Clone, Serialize)]
pub struct PortsStatus {
    /// Raw VNC TCP port.
    pub vnc: u16,
    /// noVNC web client port.
    pub novnc: u16,
    /// This HTTP server's port.
    pub http: u16,
}

/// Status response body.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Display name of the exposed service.
    pub service: String,
    /// Connection identifier.
    pub connection_name: String,
    /// Collaborator reachability.
    pub services: ServicesStatus,
    /// Exposed ports.
    pub ports: PortsStatus,
    /// Number of live relay sessions.
    pub active_sessions: usize,
    /// `"healthy"` when every service is up, `"degraded"` otherwise.
    pub overall_status: String,
}

/// Try a bounded TCP connect to the backend. Any failure is "unreachable";
/// the probe never retries and never holds the connection.
pub async fn probe_backend(addr: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// Build a status response around a completed backend probe.
pub fn status_report(
    settings: &GatewaySettings,
    backend_reachable: bool,
    active_sessions: usize,
) -> StatusResponse {
    let services = ServicesStatus {
        vnc_backend: backend_reachable,
        relay: true,
    };
    let overall = if services.vnc_backend && services.relay {
        "healthy"
    } else {
        "degraded"
    };
    StatusResponse {
        service: settings.service_name(),
        connection_name: settings.service.connection_name.clone(),
        services,
        ports: PortsStatus {
            vnc: settings.relay.vnc_port,
            novnc: settings.server.novnc_port,
            http: settings.server.http_port,
        },
        active_sessions,
        overall_status: overall.into(),
    }
}
