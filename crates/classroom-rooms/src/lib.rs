pub mod chat;
pub mod member;
pub mod registry;
pub mod room;
pub mod transport;

pub use chat::{Chat, ChatMessage, ChatStatistics};
pub use member::{Member, MemberSnapshot};
pub use registry::RoomRegistry;
pub use room::{JoinOutcome, LeaveOutcome, Question, Room};
pub use transport::{Socket, Transport};
