//! The Dispatcher (C8) lives in `classroom-gateway` and owns the actual
//! WebSocket sink; rooms only need *something* to hand an `EventFrame` to
//! and forget about delivery failures (§4.6: "broadcasting to a disconnected
//! socket is silently tolerated"). This trait is the seam.

use std::sync::Arc;

use classroom_core::types::SocketId;
use classroom_protocol::frames::EventFrame;

pub trait Transport: Send + Sync {
    fn id(&self) -> &SocketId;

    /// Best-effort delivery. Implementations must never panic or block;
    /// a dropped/disconnected socket just swallows the frame.
    fn send(&self, frame: EventFrame);
}

pub type Socket = Arc<dyn Transport>;
