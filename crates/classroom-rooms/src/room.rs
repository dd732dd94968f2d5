use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use classroom_core::types::{ChatName, Email, Role, RoomName, SocketId};
use classroom_protocol::frames::EventFrame;
use classroom_protocol::methods;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::chat::{Chat, ChatMessage};
use crate::member::{Member, MemberSnapshot};

/// One FIFO entry in a Room's question queue (§3).
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub email: Email,
    pub value: String,
}

/// Whether a `join` produced a brand-new presence entry or mirrored an
/// already-present user onto a second socket (§4.6, Design Notes §9).
pub enum JoinOutcome {
    FirstJoin,
    MirrorJoin,
}

/// What happened on `leave` — whether the whole user departed the room.
pub enum LeaveOutcome {
    SocketDetached,
    MemberLeft,
}

/// All live members of one lesson (C6): presence, chat registry, breakout
/// groups, question queue, event fan-out. One lock (or single-consumer
/// inbox) per Room serialises every mutation — see Design §5.
pub struct Room {
    pub name: RoomName,
    members: Vec<Member>,
    owners: HashSet<Email>,
    sockets: HashMap<Email, Vec<SocketId>>,
    chats: HashMap<String, Chat>,
    groups: Value,
    questions: Vec<Question>,
    pub start_time: DateTime<Utc>,
    chat_max_messages: usize,
}

impl Room {
    pub fn new(name: RoomName, chat_max_messages: usize) -> Self {
        Self {
            name,
            members: Vec::new(),
            owners: HashSet::new(),
            sockets: HashMap::new(),
            chats: HashMap::new(),
            groups: Value::Null,
            questions: Vec::new(),
            start_time: Utc::now(),
            chat_max_messages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_by_socket(&self, socket_id: &SocketId) -> Option<&Member> {
        self.members.iter().find(|m| m.socket.id() == socket_id)
    }

    fn is_first_socket_for(&self, email: &Email) -> bool {
        !self.sockets.contains_key(email)
    }

    fn owner_sockets(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| self.owners.contains(&m.email))
    }

    fn roster_snapshot(&self) -> Vec<MemberSnapshot> {
        // Dedup by email: a user with several tabs appears once in the roster.
        let mut seen = HashSet::new();
        self.members
            .iter()
            .filter(|m| seen.insert(m.email.clone()))
            .map(Member::snapshot)
            .collect()
    }

    fn chat_statistics_snapshot(&self) -> Vec<Value> {
        self.chats
            .values()
            .map(|c| json!(c.statistics()))
            .collect()
    }

    /// §4.6 `join`. First-ever socket for an email is a full join with a
    /// broadcast; a second socket for an already-present email is a
    /// mirror-join that replays state without broadcasting presence.
    pub fn join(&mut self, member: Member) -> JoinOutcome {
        let email = member.email.clone();
        let socket_id = member.socket.id().clone();
        let is_first = self.is_first_socket_for(&email);

        if member.role.is_owner() {
            self.owners.insert(email.clone());
        }

        // Re-join only the chats this email already belongs to — a brand
        // new member joins chats explicitly via `join_chat` (§4.2/§4.6), not
        // implicitly by joining the room.
        for chat in self.chats.values_mut() {
            if chat.is_member(&email) {
                chat.join(&member.clone(), &self.members);
            }
        }

        self.sockets.entry(email.clone()).or_default().push(socket_id);

        member.socket.send(EventFrame::new(
            methods::CHAT_STATISTICS,
            json!({ "chats": self.chat_statistics_snapshot() }),
        ));
        member
            .socket
            .send(EventFrame::new(methods::CREATED_GROUPS, self.groups.clone()));
        member.socket.send(EventFrame::new(
            methods::QUEUE_QUESTIONS,
            json!({ "questions": self.questions }),
        ));
        member
            .socket
            .send(EventFrame::new(methods::USERLIST, json!(self.roster_snapshot())));

        self.members.push(member);

        if is_first {
            info!(room = %self.name, email = %email, "member joined");
            for other in self.members.iter().filter(|m| m.email != email) {
                other.socket.send(EventFrame::new(
                    methods::USER_JOINS,
                    json!({ "email": email.as_str() }),
                ));
            }
            JoinOutcome::FirstJoin
        } else {
            debug!(room = %self.name, email = %email, "mirror join");
            JoinOutcome::MirrorJoin
        }
    }

    /// §4.6 `leave`. Returns `None` if the socket wasn't present.
    pub fn leave(&mut self, socket_id: &SocketId) -> Option<LeaveOutcome> {
        let idx = self.members.iter().position(|m| m.socket.id() == socket_id)?;
        let email = self.members[idx].email.clone();

        if let Some(list) = self.sockets.get_mut(&email) {
            list.retain(|s| s != socket_id);
        }
        self.members.remove(idx);

        let remaining_sockets = self.sockets.get(&email).map(|v| v.len()).unwrap_or(0);
        if remaining_sockets > 0 {
            return Some(LeaveOutcome::SocketDetached);
        }

        self.sockets.remove(&email);
        self.owners.remove(&email);
        for chat in self.chats.values_mut() {
            chat.leave(&email, &self.members);
        }

        for other in &self.members {
            other.socket.send(EventFrame::new(
                methods::USER_LEAVES,
                json!({ "email": email.as_str() }),
            ));
        }
        info!(room = %self.name, email = %email, "member left");
        Some(LeaveOutcome::MemberLeft)
    }

    /// §4.6 `emit_to_members` — fan out to the whole room, including the
    /// sender, with the anonymity rewrite applied when requested.
    pub fn emit_to_members(&self, event_type: &str, mut data: Value, anonymous: bool) {
        if anonymous {
            data = project_anonymous(data);
        }
        for member in &self.members {
            member
                .socket
                .send(EventFrame::new(methods::EVENT, json!({ "type": event_type, "data": data })));
        }
    }

    /// §4.6 `emit_to_owners` — same rewrite, restricted to the owners
    /// sub-channel. Owners always includes the sender when the sender is
    /// itself an owner, so no separate echo step is needed.
    pub fn emit_to_owners(&self, event_type: &str, mut data: Value, anonymous: bool) {
        if anonymous {
            data = project_anonymous(data);
        }
        for member in self.owner_sockets() {
            member.socket.send(EventFrame::new(
                methods::EVENT,
                json!({ "type": event_type, "data": data }),
            ));
        }
    }

    pub fn emit_to_email(&self, target: &Email, event_type: &str, data: Value) {
        for member in self.members.iter().filter(|m| &m.email == target) {
            member
                .socket
                .send(EventFrame::new(methods::EVENT, json!({ "type": event_type, "data": data })));
        }
    }

    /// §4.6 `emit_progress` — owners sub-channel receives `{email, progress}`.
    pub fn emit_progress(&self, progress: f64, member: &Member) {
        for owner in self.owner_sockets() {
            owner.socket.send(EventFrame::new(
                methods::PROGRESS,
                json!({ "email": member.email.as_str(), "progress": progress }),
            ));
        }
    }

    pub fn create_groups(&mut self, groups: Value) {
        self.groups = groups.clone();
        for member in &self.members {
            member
                .socket
                .send(EventFrame::new(methods::CREATED_GROUPS, groups.clone()));
        }
    }

    pub fn delete_groups(&mut self) {
        self.groups = Value::Null;
        for member in &self.members {
            member
                .socket
                .send(EventFrame::new(methods::DELETED_GROUPS, Value::Null));
        }
    }

    fn broadcast_questions(&self) {
        for member in &self.members {
            member.socket.send(EventFrame::new(
                methods::QUEUE_QUESTIONS,
                json!({ "questions": self.questions }),
            ));
        }
    }

    pub fn add_question(&mut self, value: String, member: &Member) {
        self.questions.push(Question {
            email: member.email.clone(),
            value,
        });
        self.broadcast_questions();
    }

    /// Amend by exact `(email, value)` match, per §4.6.
    pub fn remove_question(&mut self, value: &str, member: &Member) {
        self.questions
            .retain(|q| !(q.email == member.email && q.value == value));
        self.broadcast_questions();
    }

    pub fn close_chat_for_all(&mut self, local_name: &str) {
        if let Some(chat) = self.chats.get_mut(local_name) {
            chat.close_for_all(&self.members);
        }
    }

    pub fn chat_name(&self, local_name: &str) -> ChatName {
        ChatName::new(&self.name, local_name)
    }

    pub fn get_or_create_chat(&mut self, local_name: &str) -> &mut Chat {
        let name = self.chat_name(local_name);
        let max = self.chat_max_messages;
        self.chats
            .entry(local_name.to_string())
            .or_insert_with(|| Chat::new(name, max))
    }

    pub fn join_chat(&mut self, local_name: &str, socket_id: &SocketId) -> Option<bool> {
        let joiner = self.member_by_socket(socket_id)?.clone();
        let snapshot: Vec<Member> = self.members.iter().cloned().collect();
        let chat = self.get_or_create_chat(local_name);
        Some(chat.join(&joiner, &snapshot))
    }

    pub fn leave_chat(&mut self, local_name: &str, socket_id: &SocketId) {
        let Some(member) = self.member_by_socket(socket_id) else {
            return;
        };
        let email = member.email.clone();
        let snapshot: Vec<Member> = self.members.iter().cloned().collect();
        if let Some(chat) = self.chats.get_mut(local_name) {
            chat.leave(&email, &snapshot);
        }
    }

    pub fn send_chat_message(&mut self, local_name: &str, message: ChatMessage) {
        if let Some(chat) = self.chats.get_mut(local_name) {
            chat.send(message, &self.members);
        }
    }
}

/// Dynamic anonymity rewrite (§9 Design Notes): overwrite identifying fields
/// on a shallow copy, leaving the canonical message untouched in history.
fn project_anonymous(mut data: Value) -> Value {
    if let Value::Object(ref mut map) = data {
        map.insert("email".to_string(), json!("anonymous"));
        map.insert("name".to_string(), json!("anonymous"));
    }
    data
}
