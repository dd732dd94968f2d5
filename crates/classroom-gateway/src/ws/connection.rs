//! WS connection lifecycle — grounded on `skynet-gateway/ws/connection.rs`'s
//! split sink/stream shape, adapted for a per-connection writer task (see
//! `ws::transport`) and for a handshake resolved at upgrade time instead of
//! an in-band `connect` frame (§4.7: "Auth is called once per dispatcher
//! connection").

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use classroom_collab::InstanceHandle;
use classroom_core::collaborators::ResolvedUser;
use classroom_core::types::{Role, RoomName, SocketId};
use classroom_protocol::frames::InboundFrame;
use classroom_rooms::registry::RoomHandle;

use crate::app::AppState;
use crate::ws::dispatch;
use crate::ws::transport::WsTransport;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: String,
}

/// Per-connection mutable state threaded through every dispatched request.
pub struct ConnectionCtx {
    pub socket_id: SocketId,
    pub transport: Arc<WsTransport>,
    pub user: ResolvedUser,
    pub display_name: String,
    pub role: Role,
    pub room: Option<(RoomName, RoomHandle)>,
    /// `(doc_id, client_id, handle)` for every document this socket has
    /// joined via `join_collaborative_editing` — walked on disconnect so
    /// each instance's `remove_user` (§4.5) runs exactly once per doc.
    pub joined_docs: Vec<(String, String, InstanceHandle)>,
    pub state: Arc<AppState>,
}

impl ConnectionCtx {
    fn new(socket_id: SocketId, transport: Arc<WsTransport>, user: ResolvedUser, state: Arc<AppState>) -> Self {
        let display_name = user.display_name.clone();
        Self {
            socket_id,
            transport,
            user,
            display_name,
            role: Role::Student,
            room: None,
            joined_docs: Vec::new(),
            state,
        }
    }
}

/// Axum handler — upgrades HTTP to WebSocket at GET /ws?token=...
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.auth.resolve_token(&query.token).await {
        Ok(user) => ws.on_upgrade(move |socket| handle_connection(socket, state, user)).into_response(),
        Err(e) => {
            warn!(error = %e, "ws upgrade rejected: auth failed");
            (StatusCode::UNAUTHORIZED, e.to_string()).into_response()
        }
    }
}

/// Per-connection task — lives for the entire WS session lifetime.
async fn handle_connection(socket: WebSocket, state: Arc<AppState>, user: ResolvedUser) {
    let socket_id = SocketId::new();
    info!(socket = %socket_id, email = %user.email, "ws connection opened");
    state.connection_opened();

    let (mut sink, mut stream) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Message>();
    let transport = Arc::new(WsTransport::new(socket_id.clone(), frame_tx));

    let writer = tokio::spawn(async move {
        while let Some(message) = frame_rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut ctx = ConnectionCtx::new(socket_id.clone(), transport.clone(), user, state.clone());
    let max_payload = state.config.gateway.max_payload_bytes;

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if text.len() > max_payload {
                    warn!(socket = %socket_id, size = text.len(), "payload too large, closing");
                    break;
                }
                if handle_text(&mut ctx, &text).await {
                    break;
                }
            }
            Ok(Message::Ping(data)) => transport.send_message(Message::Pong(data)),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(socket = %socket_id, error = %e, "ws read error, closing");
                break;
            }
        }
    }

    dispatch::cleanup_connection(&mut ctx).await;
    drop(ctx);
    drop(transport);
    let _ = writer.await;
    state.connection_closed();
    info!(socket = %socket_id, "ws connection closed");
}

/// Parse one inbound text frame and dispatch it. Returns `true` if the
/// connection should close afterward (an explicit `disconnect`).
async fn handle_text(ctx: &mut ConnectionCtx, text: &str) -> bool {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            warn!(socket = %ctx.socket_id, error = %e, "malformed frame, ignoring");
            return false;
        }
    };
    let Some(req) = frame.as_req() else {
        return false;
    };
    dispatch::handle_request(ctx, req).await
}
