//! Settings structs: service branding, HTTP server binding, relay tuning.

use serde::{Deserialize, Serialize};

/// Top-level gateway settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// Branding shown on the landing page and in health responses.
    pub service: ServiceSettings,
    /// HTTP server binding.
    pub server: ServerSettings,
    /// Relay behavior.
    pub relay: RelaySettings,
}

impl GatewaySettings {
    /// Resolved service name: the configured name, or one derived from the
    /// connection name when unset.
    pub fn service_name(&self) -> String {
        self.service.name.clone().unwrap_or_else(|| {
            format!("Lab {}", self.service.connection_name.to_uppercase())
        })
    }

    /// The backend address the relay connects to, as `host:port`.
    pub fn vnc_addr(&self) -> String {
        format!("{}:{}", self.relay.vnc_host, self.relay.vnc_port)
    }
}

/// Branding and identity of the exposed session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceSettings {
    /// Short identifier for this lab/connection.
    pub connection_name: String,
    /// Display name. `None` derives one from `connection_name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// One-line description shown under the title.
    pub description: String,
    /// Accent color for the landing page.
    pub primary_color: String,
    /// Background gradient start color.
    pub bg_gradient_start: String,
    /// Background gradient end color.
    pub bg_gradient_end: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            connection_name: "lab".to_string(),
            name: None,
            description: "Remote desktop session".to_string(),
            primary_color: "#8bc34a".to_string(),
            bg_gradient_start: "#1b5e20".to_string(),
            bg_gradient_end: "#388e3c".to_string(),
        }
    }
}

/// HTTP server network settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP port serving the page, the endpoints, and the websocket upgrade.
    pub http_port: u16,
    /// Port the noVNC client bundle is served on (external collaborator);
    /// only used to build the client URL on the landing page.
    pub novnc_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 5000,
            novnc_port: 6901,
        }
    }
}

/// Relay tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// VNC backend host.
    pub vnc_host: String,
    /// VNC backend port.
    pub vnc_port: u16,
    /// Backend connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Session idle timeout in milliseconds. `0` disables the watchdog.
    pub idle_timeout_ms: u64,
    /// Fixed read buffer size for the backend→client leg, in bytes.
    pub read_buffer_size: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            vnc_host: "127.0.0.1".to_string(),
            vnc_port: 5901,
            connect_timeout_ms: 10_000,
            idle_timeout_ms: 0,
            read_buffer_size: 4096,
        }
    }
}
