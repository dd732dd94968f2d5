use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use classroom_core::types::{ChatName, Email};
use classroom_protocol::frames::EventFrame;
use classroom_protocol::methods;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::member::Member;

pub const DEFAULT_AVATAR: &str = "default";
pub const ANONYMOUS_DISPLAY: &str = "Anonymous";

/// One message in a Chat's bounded history (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub body: String,
    pub author_display: String,
    pub author_email: Email,
    pub avatar: String,
    pub timestamp: DateTime<Utc>,
    pub anonymous: bool,
}

impl ChatMessage {
    /// The view delivered to a student recipient — `author_display`/`avatar`
    /// rewritten to the anonymous placeholder when `anonymous` is set.
    /// Owners always see the canonical message unchanged.
    fn project(&self, viewer_is_owner: bool) -> ChatMessage {
        if viewer_is_owner || !self.anonymous {
            return self.clone();
        }
        let mut projected = self.clone();
        projected.author_display = ANONYMOUS_DISPLAY.to_string();
        projected.avatar = DEFAULT_AVATAR.to_string();
        projected
    }
}

#[derive(Debug, Clone, Serialize)]
struct RosterEntry {
    email: Email,
    display_name: String,
    avatar: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatStatistics {
    pub name: String,
    pub member_count: usize,
    pub message_count: usize,
}

/// One named message stream inside a Room (C2). Bounded FIFO history,
/// deduped-by-email roster.
pub struct Chat {
    pub name: ChatName,
    max_messages: usize,
    messages: VecDeque<ChatMessage>,
    roster: Vec<RosterEntry>,
}

impl Chat {
    pub fn new(name: ChatName, max_messages: usize) -> Self {
        Self {
            name,
            max_messages,
            messages: VecDeque::new(),
            roster: Vec::new(),
        }
    }

    pub fn is_member(&self, email: &Email) -> bool {
        self.roster.iter().any(|r| &r.email == email)
    }

    fn history_view(&self, viewer_is_owner: bool) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| m.project(viewer_is_owner))
            .collect()
    }

    fn roster_view(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// §4.2 join. Returns `true` when this was a mirror-join (no broadcast
    /// emitted, no duplicate roster entry created).
    pub fn join(&mut self, joiner: &Member, room_members: &[Member]) -> bool {
        let mirror = self.is_member(&joiner.email);
        if !mirror {
            self.roster.push(RosterEntry {
                email: joiner.email.clone(),
                display_name: joiner.display_name.clone(),
                avatar: joiner.avatar.clone(),
            });
        }

        joiner.socket.send(EventFrame::new(
            methods::CHAT_HISTORY,
            json!({
                "chatroom": self.name.as_str(),
                "messages": self.history_view(joiner.role.is_owner()),
                "roster": self.roster_view(),
            }),
        ));
        joiner
            .socket
            .send(EventFrame::new(methods::CHAT_STATISTICS, json!(self.statistics())));

        if !mirror {
            for other in room_members
                .iter()
                .filter(|m| self.is_member(&m.email) && m.socket.id() != joiner.socket.id())
            {
                other.socket.send(EventFrame::new(
                    methods::MEMBER_HAS_JOINED_CHAT,
                    json!({ "chatroom": self.name.as_str(), "email": joiner.email.as_str() }),
                ));
            }
        }
        mirror
    }

    /// §4.2 leave. Broadcasts to remaining roster then removes the email.
    pub fn leave(&mut self, leaver_email: &Email, room_members: &[Member]) {
        if !self.is_member(leaver_email) {
            return;
        }
        for other in room_members
            .iter()
            .filter(|m| self.is_member(&m.email) && &m.email != leaver_email)
        {
            other.socket.send(EventFrame::new(
                methods::MEMBER_HAS_LEFT_CHAT,
                json!({ "chatroom": self.name.as_str(), "email": leaver_email.as_str() }),
            ));
        }
        self.roster.retain(|r| &r.email != leaver_email);
    }

    /// §4.2 send. Owners get the raw message, students get the anonymity
    /// projection; history and room-facing statistics update either way.
    pub fn send(&mut self, message: ChatMessage, room_members: &[Member]) {
        for recipient in room_members
            .iter()
            .filter(|m| self.is_member(&m.email))
        {
            let view = message.project(recipient.role.is_owner());
            recipient.socket.send(EventFrame::new(
                methods::CHAT_MESSAGE,
                json!({ "chatroom": self.name.as_str(), "message": view }),
            ));
        }

        self.messages.push_back(message);
        if self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }

        let stats = self.statistics();
        for member in room_members.iter().filter(|m| self.is_member(&m.email)) {
            member
                .socket
                .send(EventFrame::new(methods::CHAT_STATISTICS, json!(stats)));
        }
    }

    /// §4.2 close_for_all — instructor closes a breakout chat.
    pub fn close_for_all(&mut self, room_members: &[Member]) {
        for member in room_members.iter().filter(|m| self.is_member(&m.email)) {
            member.socket.send(EventFrame::new(
                methods::CLOSED_CHAT,
                json!({ "chatroom": self.name.as_str() }),
            ));
        }
        debug!(chat = %self.name, "closed chat for all members");
        self.roster.clear();
        self.messages.clear();
    }

    pub fn statistics(&self) -> ChatStatistics {
        ChatStatistics {
            name: self.name.as_str().to_string(),
            member_count: self.roster.len(),
            message_count: self.messages.len(),
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::test_support::RecordingTransport;
    use classroom_core::types::Role;

    fn member(email: &str, role: Role) -> Member {
        Member::new(
            Email::from(email),
            email.to_string(),
            role,
            "avatar.png".to_string(),
            RecordingTransport::new(),
        )
    }

    #[test]
    fn overflow_drops_oldest_message() {
        let name = ChatName(format!("ns/l:general"));
        let mut chat = Chat::new(name, 2);
        let members = vec![member("alice@example.com", Role::Owner)];
        for i in 0..3 {
            chat.send(
                ChatMessage {
                    body: format!("msg{i}"),
                    author_display: "Alice".into(),
                    author_email: Email::from("alice@example.com"),
                    avatar: "a.png".into(),
                    timestamp: Utc::now(),
                    anonymous: false,
                },
                &members,
            );
        }
        assert_eq!(chat.message_count(), 2);
    }

    #[test]
    fn mirror_join_does_not_duplicate_roster() {
        let name = ChatName("ns/l:general".to_string());
        let mut chat = Chat::new(name, 250);
        let bob1 = member("bob@example.com", Role::Student);
        let bob2 = member("bob@example.com", Role::Student);
        let room_members = vec![];
        let first = chat.join(&bob1, &room_members);
        let second = chat.join(&bob2, &room_members);
        assert!(!first);
        assert!(second, "second join by same email must be a mirror-join");
        assert_eq!(chat.statistics().member_count, 1);
    }

    #[test]
    fn anonymous_message_is_redacted_for_students_only() {
        let name = ChatName("ns/l:general".to_string());
        let mut chat = Chat::new(name, 250);

        let owner_transport = RecordingTransport::new();
        let student_transport = RecordingTransport::new();
        let owner = Member::new(
            Email::from("alice@example.com"),
            "Alice".to_string(),
            Role::Owner,
            "avatar.png".to_string(),
            owner_transport.clone(),
        );
        let student = Member::new(
            Email::from("carol@example.com"),
            "Carol".to_string(),
            Role::Student,
            "avatar.png".to_string(),
            student_transport.clone(),
        );
        chat.join(&owner, &[]);
        chat.join(&student, &[]);

        let room_members = vec![owner, student];
        chat.send(
            ChatMessage {
                body: "hi".into(),
                author_display: "Bob".into(),
                author_email: Email::from("bob@example.com"),
                avatar: "bob.png".into(),
                timestamp: Utc::now(),
                anonymous: true,
            },
            &room_members,
        );

        let owner_frames = owner_transport.sent();
        let owner_msg = owner_frames
            .iter()
            .find(|f| f.event == methods::CHAT_MESSAGE)
            .unwrap();
        assert_eq!(
            owner_msg.payload.as_ref().unwrap()["message"]["author_display"],
            "Bob"
        );

        let student_frames = student_transport.sent();
        let student_msg = student_frames
            .iter()
            .find(|f| f.event == methods::CHAT_MESSAGE)
            .unwrap();
        assert_eq!(
            student_msg.payload.as_ref().unwrap()["message"]["author_display"],
            "Anonymous"
        );
    }
}
