//! Router assembly and server startup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use periscope_relay::SessionRegistry;
use periscope_settings::GatewaySettings;

use crate::health::{self, HealthResponse};
use crate::page;
use crate::shutdown::ShutdownCoordinator;
use crate::status;
use crate::ws;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded gateway settings.
    pub settings: Arc<GatewaySettings>,
    /// Live relay sessions.
    pub sessions: Arc<SessionRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Handle for rendering `/metrics`, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Fresh state around loaded settings.
    #[must_use]
    pub fn new(settings: GatewaySettings, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            settings: Arc::new(settings),
            sessions: Arc::new(SessionRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics,
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .route("/websockify", get(ws::websockify_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Handle returned by [`start`] — keeps the serve task alive.
pub struct ServerHandle {
    /// The bound port (useful with port 0).
    pub port: u16,
    join: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Wait for the serve task to finish (it ends on graceful shutdown).
    pub async fn stopped(self) {
        let _ = self.join.await;
    }
}

/// Bind and start serving. Returns once the listener is bound.
pub async fn start(state: AppState) -> std::io::Result<ServerHandle> {
    let addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.http_port
    );
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    let token = state.shutdown.token();
    let router = build_router(state);

    info!(addr = %local_addr, "gateway listening");

    let join = tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(token.cancelled_owned())
        .await
        .ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        join,
    })
}

/// GET /
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(page::render_page(&state.settings))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        &state.settings,
        state.start_time,
        state.sessions.count(),
    ))
}

/// GET /status
async fn status_handler(State(state): State<AppState>) -> Response {
    let reachable =
        status::probe_backend(&state.settings.vnc_addr(), status::PROBE_TIMEOUT).await;
    let report = status::status_report(&state.settings, reachable, state.sessions.count());
    let code = if report.overall_status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report)).into_response()
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn dead_port_settings() -> GatewaySettings {
        // Aim the relay at a port with no listener so /status is deterministic.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut settings = GatewaySettings::default();
        settings.relay.vnc_host = "127.0.0.1".into();
        settings.relay.vnc_port = port;
        settings
    }

    async fn make_state() -> AppState {
        AppState::new(dead_port_settings().await, None)
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = build_router(make_state().await);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "healthy");
        assert_eq!(parsed["active_sessions"], 0);
        assert!(parsed["vnc_ports"]["direct"].is_number());
    }

    #[tokio::test]
    async fn status_degraded_without_backend() {
        let app = build_router(make_state().await);
        let req = Request::builder()
            .uri("/status")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["overall_status"], "degraded");
        assert_eq!(parsed["services"]["vnc_backend"], false);
    }

    #[tokio::test]
    async fn status_healthy_with_backend_listening() {
        let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = backend.local_addr().unwrap().port();

        let mut settings = GatewaySettings::default();
        settings.relay.vnc_host = "127.0.0.1".into();
        settings.relay.vnc_port = port;
        let app = build_router(AppState::new(settings, None));

        let req = Request::builder()
            .uri("/status")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn index_serves_branded_page() {
        let app = build_router(make_state().await);
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<title>Lab LAB</title>"));
        assert!(html.contains("/vnc.html"));
    }

    #[tokio::test]
    async fn metrics_missing_recorder_is_404() {
        let app = build_router(make_state().await);
        let req = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build_router(make_state().await);
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn server_starts_on_ephemeral_port() {
        let mut settings = dead_port_settings().await;
        settings.server.host = "127.0.0.1".into();
        settings.server.http_port = 0;
        let state = AppState::new(settings, None);
        let shutdown = state.shutdown.clone();

        let handle = start(state).await.unwrap();
        assert!(handle.port > 0);

        shutdown.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle.stopped())
            .await
            .expect("serve task must stop after shutdown");
    }
}
