//! Typed payload schemas for the §6 wire-level message table. Steps and
//! comment events travel as opaque JSON here — `classroom-collab` owns the
//! concrete `OperationSeq` encoding and decodes these at the boundary, so
//! this crate stays transport-only and never depends on the OT library.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinParams {
    pub namespace_name: String,
    pub lesson_name: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
}

/// Routing tag for `event` (§4.7: `target ∈ {"members","owners","<email>"}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTarget {
    Members,
    Owners,
    Email(String),
}

impl EventTarget {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "members" => EventTarget::Members,
            "owners" => EventTarget::Owners,
            other => EventTarget::Email(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventParams {
    pub target: String,
    /// Action-specific tag carried in the outbound envelope's `data.type`
    /// (§6: "`event` in/out `{…action-specific…, anonymous?}`").
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressParams {
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinChatParams {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageParams {
    pub chatroom: String,
    pub body: String,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageWire {
    pub body: String,
    pub author_display: String,
    pub author_email: String,
    pub avatar: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStatisticsWire {
    pub name: String,
    pub member_count: usize,
    pub message_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectInvitationParams {
    pub data: Value,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupsParams {
    pub groups: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionParams {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinCollaborativeEditingParams {
    pub doc_id: String,
    /// Stable per-tab identity, shared with the `client_id` on every later
    /// `send_collaborative_editing_events`/`update_cursor` (§4.3: cursors
    /// are keyed by `client_id`; instance `users` are keyed by email).
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedCollaborativeEditingPayload {
    pub doc: Value,
    pub users: Value,
    pub version: u64,
    pub comments: Value,
    pub comment_version: u64,
    pub cursors: Value,
}

/// One transformed step as it travels over the wire; `op` is whatever the
/// JSON encoding of the collaborating crate's operation sequence type is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepWire {
    pub client_id: String,
    pub op: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEventWire {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCollaborativeEditingEventsParams {
    pub doc_id: String,
    pub version: i64,
    pub steps: Vec<StepWire>,
    #[serde(default)]
    pub comment: Vec<CommentEventWire>,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborativeEditingEventsPayload {
    pub version: u64,
    pub comment_version: u64,
    pub user_count: usize,
    pub steps: Vec<StepWire>,
    pub comment: Vec<CommentEventWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursors: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollCollaborativeEditingEventsParams {
    pub doc_id: String,
    pub version: u64,
    pub comment_version: u64,
    pub cursor_version: u64,
}

/// §4.4 `update_cursor` — not in the §6 wire table's printed excerpt, but
/// named as its own operation in the component design; travels as its own
/// method so a caret move doesn't have to ride along with a step batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCursorParams {
    pub doc_id: String,
    pub client_id: String,
    pub ranges: Vec<(u32, u32)>,
}
