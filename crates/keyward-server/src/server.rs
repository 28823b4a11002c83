//! `KeywardServer` — router assembly and WebSocket upgrade.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use keyward_store::LicenseStore;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;
use uuid::Uuid;

use crate::api;
use crate::config::ServerConfig;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// License record store.
    pub store: Arc<LicenseStore>,
    /// Open-connection membership.
    pub registry: Arc<ConnectionRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Server configuration.
    pub config: ServerConfig,
}

/// The keyward server: WebSocket validation protocol plus control-plane
/// CRUD over one record store.
pub struct KeywardServer {
    config: ServerConfig,
    store: Arc<LicenseStore>,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl KeywardServer {
    /// Create a new server over an already-migrated store.
    pub fn new(config: ServerConfig, store: Arc<LicenseStore>) -> Self {
        Self {
            config,
            store,
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            store: self.store.clone(),
            registry: self.registry.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            config: self.config.clone(),
        };
        let cors = cors_layer(&self.config);

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/api/ping", get(api::ping))
            .route(
                "/api/licenses",
                get(api::list_licenses).post(api::create_license),
            )
            .route("/api/licenses/check/{key}", get(api::check_license))
            .route(
                "/api/licenses/{id}",
                put(api::update_license).delete(api::delete_license),
            )
            .with_state(state)
            .layer(cors)
    }

    /// Get the connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// CORS allow-list for the configured operator origins.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// GET /ws — upgrade and hand off to the session loop.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.registry.connection_count().await >= state.config.max_connections {
        warn!("connection limit reached, refusing upgrade");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let conn_id = format!("conn_{}", Uuid::now_v7());
    let interval = state.config.heartbeat_interval();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(
                socket,
                conn_id,
                state.store.clone(),
                state.registry.clone(),
                interval,
            )
        })
        .into_response()
}
