use chrono::{DateTime, Utc};
use classroom_core::types::{Email, Role};
use serde::Serialize;

use crate::transport::Socket;

/// Snapshot of one user connected through one transport socket (C1). A user
/// holding several browser tabs produces several `Member`s sharing one
/// `email`; value object only, no business logic of its own.
///
/// `Clone` is cheap: `socket` is an `Arc`, everything else is a plain value.
/// Room/Chat replay state onto a freshly joined socket by cloning the
/// existing `Member` rather than constructing a second owner of it.
#[derive(Clone)]
pub struct Member {
    pub email: Email,
    pub display_name: String,
    pub role: Role,
    pub avatar: String,
    pub joined_at: DateTime<Utc>,
    pub exited_at: Option<DateTime<Utc>>,
    pub socket: Socket,
}

impl Member {
    pub fn new(
        email: Email,
        display_name: String,
        role: Role,
        avatar: String,
        socket: Socket,
    ) -> Self {
        Self {
            email,
            display_name,
            role,
            avatar,
            joined_at: Utc::now(),
            exited_at: None,
            socket,
        }
    }

    pub fn mark_exit(&mut self) {
        self.exited_at = Some(Utc::now());
    }

    pub fn snapshot(&self) -> MemberSnapshot {
        MemberSnapshot {
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
            joined_at: self.joined_at,
            exited_at: self.exited_at,
        }
    }
}

/// Broadcastable view of a Member — suitable for presence fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct MemberSnapshot {
    pub email: Email,
    pub display_name: String,
    pub role: Role,
    pub avatar: String,
    pub joined_at: DateTime<Utc>,
    pub exited_at: Option<DateTime<Utc>>,
}
