//! Process-wide mapping from "namespace/lesson" to Room (C7). Creates a Room
//! on the first join for a (namespace, lesson) pair with none live yet;
//! destroys it once its last member leaves (§3 Room lifecycle).
//!
//! Per §5: the registry map itself is protected by one lock guarding
//! insertion/eviction, while each Room serialises its own mutations behind
//! its own lock — cross-room operations need no coordination.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use classroom_core::types::RoomName;
use tracing::info;

use crate::room::Room;

pub type RoomHandle = Arc<Mutex<Room>>;

pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomName, RoomHandle>>,
    chat_max_messages: usize,
}

impl RoomRegistry {
    pub fn new(chat_max_messages: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            chat_max_messages,
        }
    }

    /// Return the Room for `name`, creating an empty one if none is live.
    pub fn get_or_create(&self, name: &RoomName) -> RoomHandle {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(name.clone())
            .or_insert_with(|| {
                info!(room = %name, "room created");
                Arc::new(Mutex::new(Room::new(name.clone(), self.chat_max_messages)))
            })
            .clone()
    }

    /// Return the Room for `name` without creating one.
    pub fn get(&self, name: &RoomName) -> Option<RoomHandle> {
        self.rooms.lock().unwrap().get(name).cloned()
    }

    /// Drop `name` from the registry if its Room has become empty. Callers
    /// invoke this after every `leave` — a no-op if the room still has
    /// members or is already gone.
    pub fn evict_if_empty(&self, name: &RoomName) {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(handle) = rooms.get(name) else {
            return;
        };
        if handle.lock().unwrap().is_empty() {
            rooms.remove(name);
            info!(room = %name, "room destroyed");
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Member;
    use crate::room::{JoinOutcome, LeaveOutcome};
    use crate::transport::test_support::RecordingTransport;
    use classroom_core::types::{Email, Role};

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
    fn room_is_created_on_first_join_and_destroyed_on_last_leave() {
        let registry = RoomRegistry::new(250);
        let name = RoomName::new("algebra-101", "linear-equations");

        assert!(registry.get(&name).is_none());

        let handle = registry.get_or_create(&name);
        let alice = member("alice@example.com", Role::Owner);
        let socket_id = alice.socket.id().clone();
        {
            let mut room = handle.lock().unwrap();
            assert!(matches!(room.join(alice), JoinOutcome::FirstJoin));
        }
        assert_eq!(registry.room_count(), 1);

        {
            let mut room = handle.lock().unwrap();
            assert!(matches!(
                room.leave(&socket_id),
                Some(LeaveOutcome::MemberLeft)
            ));
        }
        registry.evict_if_empty(&name);
        assert_eq!(registry.room_count(), 0);
        assert!(registry.get(&name).is_none());
    }

    #[test]
    fn room_survives_eviction_check_while_members_remain() {
        let registry = RoomRegistry::new(250);
        let name = RoomName::new("algebra-101", "linear-equations");
        let handle = registry.get_or_create(&name);

        let alice = member("alice@example.com", Role::Owner);
        let bob = member("bob@example.com", Role::Student);
        let bob_socket = bob.socket.id().clone();
        {
            let mut room = handle.lock().unwrap();
            room.join(alice);
            room.join(bob);
        }

        {
            let mut room = handle.lock().unwrap();
            room.leave(&bob_socket);
        }
        registry.evict_if_empty(&name);
        assert_eq!(registry.room_count(), 1, "Alice is still present");
    }
}
