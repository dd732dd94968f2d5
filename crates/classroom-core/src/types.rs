use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ClassroomError, Result};

/// Stable identity of a signed-in user. The core never hashes or verifies
/// credentials itself — `Auth` hands back an already-resolved email.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Email(pub String);

impl Email {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Email {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Email {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-connection identifier for one transport socket (not persisted).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketId(pub String);

impl SocketId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SocketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `"<namespaceTitle>/<lessonTitle>"` — coined by the core itself (§6).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomName(pub String);

impl RoomName {
    pub fn new(namespace_title: &str, lesson_title: &str) -> Self {
        Self(format!("{}/{}", namespace_title, lesson_title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `"<roomName>:<localChatName>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatName(pub String);

impl ChatName {
    pub fn new(room: &RoomName, local_name: &str) -> Self {
        Self(format!("{}:{}", room.as_str(), local_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `"<namespaceID>-<lessonID>-<componentID>"`, parsed back with
/// `^([^-]+)-([^-]+)-([\s\S]+?)$` (§6). Component ids may themselves contain
/// dashes, so parsing splits on the first two dashes only, matching the
/// non-greedy tail group in the source regex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(namespace_id: &str, lesson_id: &str, component_id: &str) -> Self {
        Self(format!("{}-{}-{}", namespace_id, lesson_id, component_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits back into `(namespace_id, lesson_id, component_id)`.
    pub fn parse(&self) -> Result<(String, String, String)> {
        let rest = self.0.as_str();
        let (namespace_id, rest) = rest
            .split_once('-')
            .ok_or_else(|| ClassroomError::InvalidInput(format!("malformed document id: {}", self.0)))?;
        let (lesson_id, component_id) = rest
            .split_once('-')
            .ok_or_else(|| ClassroomError::InvalidInput(format!("malformed document id: {}", self.0)))?;
        if namespace_id.is_empty() || lesson_id.is_empty() || component_id.is_empty() {
            return Err(ClassroomError::InvalidInput(format!(
                "malformed document id: {}",
                self.0
            )));
        }
        Ok((
            namespace_id.to_string(),
            lesson_id.to_string(),
            component_id.to_string(),
        ))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Member role within a Room (§3). Owners see un-anonymised chat and
/// privileged broadcasts; students see projected views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Owner,
}

impl Role {
    pub fn is_owner(&self) -> bool {
        matches!(self, Role::Owner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Owner => write!(f, "owner"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "owner" => Ok(Role::Owner),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_and_chat_name_round_trip() {
        let room = RoomName::new("algebra-101", "linear-equations");
        assert_eq!(room.as_str(), "algebra-101/linear-equations");
        let chat = ChatName::new(&room, "general");
        assert_eq!(chat.as_str(), "algebra-101/linear-equations:general");
    }

    #[test]
    fn document_id_parses_back() {
        let id = DocumentId::new("ns1", "lesson7", "component-with-dash");
        let (ns, lesson, component) = id.parse().unwrap();
        assert_eq!(ns, "ns1");
        assert_eq!(lesson, "lesson7");
        assert_eq!(component, "component-with-dash");
    }

    #[test]
    fn document_id_rejects_malformed() {
        let id = DocumentId("no-dashes-missing".to_string());
        assert!(id.parse().is_ok());
        let bad = DocumentId("onlyonepart".to_string());
        assert!(bad.parse().is_err());
    }

    #[test]
    fn role_from_str_round_trips() {
        assert_eq!("owner".parse::<Role>().unwrap(), Role::Owner);
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert!("admin".parse::<Role>().is_err());
    }
}
