//! # periscope-gateway
//!
//! Gateway binary — wires settings, logging, and metrics together and
//! starts the HTTP/WebSocket server.

#![deny(unsafe_code)]

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use periscope_server::AppState;
use periscope_settings::GatewaySettings;

/// How long to wait for live sessions to drain on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Periscope gateway server.
#[derive(Parser, Debug)]
#[command(name = "periscope-gateway", about = "Websocket-to-VNC gateway")]
struct Cli {
    /// Host to bind (overrides settings/env).
    #[arg(long)]
    host: Option<String>,

    /// HTTP port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// VNC backend port to relay to.
    #[arg(long)]
    vnc_port: Option<u16>,
}

/// CLI flags win over env vars and the settings file.
fn apply_cli_overrides(settings: &mut GatewaySettings, cli: &Cli) {
    if let Some(host) = &cli.host {
        settings.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        settings.server.http_port = port;
    }
    if let Some(vnc_port) = cli.vnc_port {
        settings.relay.vnc_port = vnc_port;
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut settings =
        periscope_settings::load_settings().context("failed to load settings")?;
    apply_cli_overrides(&mut settings, &cli);

    let metrics = periscope_server::metrics::install_recorder();

    info!(
        service = %settings.service_name(),
        vnc = %settings.vnc_addr(),
        novnc_port = settings.server.novnc_port,
        "starting gateway"
    );

    let state = AppState::new(settings, Some(metrics));
    let sessions = state.sessions.clone();
    let shutdown = state.shutdown.clone();

    let handle = periscope_server::start(state)
        .await
        .context("failed to bind HTTP listener")?;
    info!(port = handle.port, "gateway ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    shutdown
        .graceful_shutdown(&sessions, Some(SHUTDOWN_TIMEOUT))
        .await;
    handle.stopped().await;
    info!("gateway stopped");
    Ok(())
}
