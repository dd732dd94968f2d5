//! C3 Comments — auxiliary document state with its own monotonic version.

use operational_transform::OperationSeq;
use serde::{Deserialize, Serialize};

use crate::ot::{transform_index, Bias};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub from: u32,
    pub to: u32,
    pub text: String,
}

/// What the caller asked the instance to do to the live comment set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommentEventInput {
    Create {
        id: String,
        from: u32,
        to: u32,
        text: String,
    },
    Delete {
        id: String,
    },
}

/// The append-only log entry actually recorded (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StoredEvent {
    Create { id: String },
    Delete { id: String },
}

/// What `events_after` emits to a catching-up client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutCommentEvent {
    Create {
        id: String,
        from: u32,
        to: u32,
        text: String,
    },
    Delete {
        id: String,
    },
}

/// Ordered live comments plus an append-only event log (§3/§4.3).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Comments {
    comments: Vec<Comment>,
    events: Vec<StoredEvent>,
}

impl Comments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from a persisted live-comment array with no event history
    /// (a freshly loaded instance has nothing to replay — §4.5).
    pub fn from_persisted(comments: Vec<Comment>) -> Self {
        Self {
            comments,
            events: Vec::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.events.len() as u64
    }

    pub fn live(&self) -> &[Comment] {
        &self.comments
    }

    pub fn apply_event(&mut self, event: CommentEventInput) {
        match event {
            CommentEventInput::Create { id, from, to, text } => {
                self.comments.push(Comment {
                    id: id.clone(),
                    from,
                    to,
                    text,
                });
                self.events.push(StoredEvent::Create { id });
            }
            CommentEventInput::Delete { id } => {
                self.comments.retain(|c| c.id != id);
                self.events.push(StoredEvent::Delete { id });
            }
        }
    }

    /// §4.3 `map_through`: walk back-to-front, remapping `from`/`to` through
    /// `op`; drop any comment whose mapped range collapses (`from >= to`).
    /// No delete event is synthesised for a dropped comment — it simply
    /// stops existing (§3 invariant).
    pub fn map_through(&mut self, op: &OperationSeq) {
        let mut i = self.comments.len();
        while i > 0 {
            i -= 1;
            let new_from = transform_index(op, self.comments[i].from, Bias::Right);
            let new_to = transform_index(op, self.comments[i].to, Bias::Left);
            if new_from >= new_to {
                self.comments.remove(i);
            } else {
                self.comments[i].from = new_from;
                self.comments[i].to = new_to;
            }
        }
    }

    /// §4.3 `events_after`: replay events from `start_index` onward. A
    /// delete event is emitted verbatim; a create event is resolved against
    /// the *current* live set so a comment created then deleted within the
    /// window is omitted entirely.
    pub fn events_after(&self, start_index: u64) -> Vec<OutCommentEvent> {
        let start = (start_index as usize).min(self.events.len());
        self.events[start..]
            .iter()
            .filter_map(|ev| match ev {
                StoredEvent::Delete { id } => Some(OutCommentEvent::Delete { id: id.clone() }),
                StoredEvent::Create { id } => self
                    .comments
                    .iter()
                    .find(|c| &c.id == id)
                    .map(|c| OutCommentEvent::Create {
                        id: c.id.clone(),
                        from: c.from,
                        to: c.to,
                        text: c.text.clone(),
                    }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_range_shifts_both_endpoints() {
        let mut comments = Comments::new();
        comments.apply_event(CommentEventInput::Create {
            id: "c1".into(),
            from: 10,
            to: 20,
            text: "q".into(),
        });

        let mut op = OperationSeq::default();
        op.retain(5);
        op.insert("ABC");
        op.retain(100);
        comments.map_through(&op);

        assert_eq!(comments.live()[0].from, 13);
        assert_eq!(comments.live()[0].to, 23);
    }

    #[test]
    fn collapsed_range_is_dropped_without_delete_event() {
        let mut comments = Comments::new();
        comments.apply_event(CommentEventInput::Create {
            id: "c1".into(),
            from: 10,
            to: 12,
            text: "q".into(),
        });

        let mut op = OperationSeq::default();
        op.retain(10);
        op.delete(2);
        op.retain(100);
        comments.map_through(&op);

        assert!(comments.live().is_empty());
        assert!(comments.events_after(0).is_empty());
    }

    #[test]
    fn created_then_deleted_within_window_is_omitted() {
        let mut comments = Comments::new();
        comments.apply_event(CommentEventInput::Create {
            id: "c1".into(),
            from: 0,
            to: 1,
            text: "q".into(),
        });
        comments.apply_event(CommentEventInput::Delete { id: "c1".into() });
        let events = comments.events_after(0);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], OutCommentEvent::Delete { .. }));
    }
}
