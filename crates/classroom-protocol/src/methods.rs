// Well-known wire method/event names from the §6 wire-level message table.

// handshake / presence
pub const JOIN: &str = "join";
pub const USER_JOINS: &str = "user_joins";
pub const USER_LEAVES: &str = "user_leaves";
pub const USERLIST: &str = "userlist";
pub const CONSOLE: &str = "console";

// generic routed event + progress
pub const EVENT: &str = "event";
pub const PROGRESS: &str = "progress";

// chat
pub const JOIN_CHAT: &str = "join_chat";
pub const LEAVE_CHAT: &str = "leave_chat";
pub const CLOSE_CHAT: &str = "close_chat";
pub const CHAT_MESSAGE: &str = "chat_message";
pub const MEMBER_HAS_JOINED_CHAT: &str = "member_has_joined_chat";
pub const MEMBER_HAS_LEFT_CHAT: &str = "member_has_left_chat";
pub const CLOSED_CHAT: &str = "closed_chat";
pub const CHAT_HISTORY: &str = "chat_history";
pub const CHAT_STATISTICS: &str = "chat_statistics";

// direct invitations
pub const CHAT_INVITATION: &str = "chat_invitation";
pub const VIDEO_INVITATION: &str = "video_invitation";

// breakout groups / questions
pub const CREATE_GROUPS: &str = "create_groups";
pub const DELETE_GROUPS: &str = "delete_groups";
pub const CREATED_GROUPS: &str = "created_groups";
pub const DELETED_GROUPS: &str = "deleted_groups";
pub const ADD_QUESTION: &str = "add_question";
pub const REMOVE_QUESTION: &str = "remove_question";
pub const QUEUE_QUESTIONS: &str = "queue_questions";

// collaborative editing
pub const JOIN_COLLABORATIVE_EDITING: &str = "join_collaborative_editing";
pub const JOINED_COLLABORATIVE_EDITING: &str = "joined_collaborative_editing";
pub const SEND_COLLABORATIVE_EDITING_EVENTS: &str = "send_collaborative_editing_events";
pub const SENT_COLLABORATIVE_EDITING_EVENTS: &str = "sent_collaborative_editing_events";
pub const COLLABORATIVE_EDITING_EVENTS: &str = "collaborative_editing_events";
pub const POLL_COLLABORATIVE_EDITING_EVENTS: &str = "poll_collaborative_editing_events";
pub const POLLED_COLLABORATIVE_EDITING_EVENTS: &str = "polled_collaborative_editing_events";
pub const UPDATE_CURSOR: &str = "update_cursor";
pub const CURSOR_UPDATED: &str = "cursor_updated";

// teardown
pub const LEAVE: &str = "leave";
pub const DISCONNECT: &str = "disconnect";
