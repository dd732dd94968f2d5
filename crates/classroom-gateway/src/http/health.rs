//! GET /health — the ambient liveness probe every teacher service ships
//! (SPEC_FULL §B); business HTTP routing stays out of scope (§1).

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "ws_connections": state.ws_connections.load(Ordering::Relaxed),
        "rooms": state.rooms.room_count(),
        "document_instances": state.instances.instance_count().await,
    }))
}
