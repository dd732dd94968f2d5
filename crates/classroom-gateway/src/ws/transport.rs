//! The concrete `classroom_rooms::Transport` for one WebSocket connection.
//! `Transport::send` is synchronous and may be called from a Room's lock
//! held by any connection's worker thread, so delivery goes through an
//! unbounded channel into this connection's own writer task rather than
//! touching the WebSocket sink directly (grounded on
//! `skynet-gateway/ws/connection.rs`'s split sink/stream, adapted for a
//! cross-thread-callable send).

use axum::extract::ws::Message;
use classroom_core::types::SocketId;
use classroom_protocol::frames::EventFrame;
use classroom_rooms::Transport;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

pub struct WsTransport {
    id: SocketId,
    tx: UnboundedSender<Message>,
}

impl WsTransport {
    pub fn new(id: SocketId, tx: UnboundedSender<Message>) -> Self {
        Self { id, tx }
    }

    /// Hand a raw WS message to the writer task (used for pings/pongs, which
    /// don't go through `EventFrame`).
    pub fn send_message(&self, message: Message) {
        if self.tx.send(message).is_err() {
            debug!(socket = %self.id, "dropping frame: connection writer gone");
        }
    }

    /// Send a raw text frame (used for `ResFrame` request replies, which
    /// aren't routed through `Room`/`Chat` broadcast paths).
    pub fn send_text(&self, text: String) {
        self.send_message(Message::Text(text.into()));
    }
}

impl Transport for WsTransport {
    fn id(&self) -> &SocketId {
        &self.id
    }

    /// Best-effort delivery (§4.6: disconnected sockets silently swallow
    /// broadcasts). A closed channel just means the writer task has already
    /// exited.
    fn send(&self, frame: EventFrame) {
        let text = serde_json::to_string(&frame).unwrap_or_default();
        self.send_text(text);
    }
}
