//! Central shared state — grounded on `skynet-gateway::app::AppState`'s
//! single `Arc<AppState>` passed to every Axum handler, trimmed to the
//! collaborators this spec actually names (§6).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{routing::get, Router};
use classroom_collab::InstanceRegistry;
use classroom_core::collaborators::{Auth, NamespaceStore};
use classroom_core::ClassroomConfig;
use classroom_rooms::RoomRegistry;

pub struct AppState {
    pub config: ClassroomConfig,
    pub rooms: RoomRegistry,
    pub instances: InstanceRegistry,
    pub auth: Arc<dyn Auth>,
    pub namespaces: Arc<dyn NamespaceStore>,
    /// Count of currently-open WS connections, surfaced on `/health`.
    pub ws_connections: AtomicU64,
}

impl AppState {
    pub fn new(
        config: ClassroomConfig,
        instances: InstanceRegistry,
        auth: Arc<dyn Auth>,
        namespaces: Arc<dyn NamespaceStore>,
    ) -> Self {
        Self {
            rooms: RoomRegistry::new(config.chat.max_messages),
            instances,
            auth,
            namespaces,
            config,
            ws_connections: AtomicU64::new(0),
        }
    }

    pub fn connection_opened(&self) -> u64 {
        self.ws_connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn connection_closed(&self) {
        self.ws_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Assemble the full Axum router (§1: business HTTP routing is out of
/// scope; only the WS upgrade endpoint and the ambient health probe live
/// here).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
