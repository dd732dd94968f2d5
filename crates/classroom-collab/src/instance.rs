//! C4 Document Instance — one collaboratively edited document: live text,
//! step history, comments and cursors, and the set of users attached to it.
//!
//! Grounded on rustpad's `Rustpad::apply_edit` (transform-against-concurrent-
//! history, then apply) and on `skynet-memory::MemoryManager` for the
//! dirty/eviction bookkeeping the registry layer needs from us.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use operational_transform::OperationSeq;
use serde::{Deserialize, Serialize};

use classroom_core::collaborators::DocumentRecord;
use classroom_core::config::MAX_STEP_HISTORY;

use crate::comments::{Comment, CommentEventInput, Comments, OutCommentEvent};
use crate::cursors::{Cursors, Selection};
use crate::error::{CollabError, Result};
use crate::merge::{compact, StepMerger};

/// One accepted edit, tagged with the client that produced it so contiguous
/// runs from the same author can later be merged (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub client_id: String,
    pub op: OperationSeq,
}

/// A user attached to this instance, keyed by `email` (§4.4
/// `users: email → {active, persistent_id?}`) — distinct from the
/// per-tab `client_id` cursors are keyed by, so one user with two open
/// tabs still counts once toward `user_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub email: String,
    pub display_name: String,
    pub persistent_id: Option<String>,
    pub active: bool,
}

/// Result of accepting a batch of incoming steps from `add_events`.
#[derive(Debug, Clone)]
pub struct AddEventsResult {
    pub accepted: Vec<Step>,
    pub version: u64,
}

/// What a client catching up to `from_version` needs to replay.
#[derive(Debug, Clone)]
pub struct EventsDiff {
    pub steps: Vec<Step>,
    pub comment_events: Vec<OutCommentEvent>,
    pub version: u64,
    /// Full cursor map, present only when the caller's cursor version is
    /// behind the current one (§4.3 `Cursors.get(version)`).
    pub cursors: Option<HashMap<String, Selection>>,
}

pub struct DocumentInstance {
    pub id: String,
    text: String,
    version: u64,
    history: VecDeque<Step>,
    comments: Comments,
    cursors: Cursors,
    users: Vec<UserEntry>,
    pub last_active_at: DateTime<Utc>,
    /// Set once steps are appended since the last successful persist; the
    /// registry's eviction pass must skip any instance with this set (C5).
    dirty: bool,
}

impl DocumentInstance {
    pub fn new(id: String, seed_doc: String) -> Self {
        Self {
            id,
            text: seed_doc,
            version: 0,
            history: VecDeque::new(),
            comments: Comments::new(),
            cursors: Cursors::new(),
            users: Vec::new(),
            last_active_at: Utc::now(),
            dirty: false,
        }
    }

    /// Rehydrate a previously persisted instance (§4.5). Persisted step
    /// history is trusted verbatim; it is not re-validated against `doc`
    /// since it was already merged/applied before being written.
    pub fn from_record(id: String, record: DocumentRecord) -> Result<Self> {
        let text = serde_json::from_value::<String>(record.doc).map_err(CollabError::Serialization)?;
        let steps: Vec<Step> =
            serde_json::from_slice(&record.compressed_steps).map_err(CollabError::Serialization)?;
        Ok(Self {
            id,
            text,
            version: record.version,
            history: steps.into(),
            comments: Comments::from_persisted(
                serde_json::from_value::<Vec<Comment>>(record.comments)
                    .map_err(CollabError::Serialization)?,
            ),
            cursors: Cursors::new(),
            users: Vec::new(),
            last_active_at: Utc::now(),
            dirty: false,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Refresh `last_active_at` without otherwise touching the instance —
    /// called on every `get_instance` cache hit so LRU eviction (§4.5 C5)
    /// sees genuinely idle instances, not just ones nobody has edited.
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    pub fn mark_persisted(&mut self) {
        self.dirty = false;
    }

    pub fn comments(&self) -> &Comments {
        &self.comments
    }

    pub fn cursors(&self) -> &Cursors {
        &self.cursors
    }

    /// Accept one incoming step authored against `client_version`. Transform
    /// it against every step recorded since, append to history, apply to
    /// the live text, and remap comments/cursors through it — mirroring
    /// rustpad's `apply_edit` (§4.4).
    pub fn add_step(&mut self, client_id: &str, client_version: u64, op: OperationSeq) -> Result<AddEventsResult> {
        let step = self.apply_one_step(client_id, client_version, op)?;
        Ok(AddEventsResult {
            accepted: vec![step],
            version: self.version,
        })
    }

    /// Accept a batch of steps authored together against `base_version`
    /// (§4.4 `add_events` step 3: "tag each step with `client_id`; append to
    /// `steps[]`; bump `version` by the number of appended steps"). Each
    /// step becomes its own history entry and its own version bump rather
    /// than being composed into one — only the first step in the batch can
    /// collide with concurrent history from another client; every step
    /// after it is already caught up, since the whole batch runs under one
    /// lock hold. Same-client step collapsing only happens at persist time,
    /// via `compact_history`.
    pub fn add_steps(&mut self, client_id: &str, base_version: u64, ops: Vec<OperationSeq>) -> Result<AddEventsResult> {
        let mut accepted = Vec::with_capacity(ops.len());
        let mut next_base = base_version;
        for op in ops {
            let step = self.apply_one_step(client_id, next_base, op)?;
            next_base = self.version;
            accepted.push(step);
        }
        Ok(AddEventsResult {
            accepted,
            version: self.version,
        })
    }

    fn apply_one_step(&mut self, client_id: &str, client_version: u64, op: OperationSeq) -> Result<Step> {
        if client_version > self.version {
            return Err(CollabError::InvalidInput(format!(
                "client_version {client_version} ahead of server version {}",
                self.version
            )));
        }

        let mut transformed = op;
        let skip_from = (self.version - client_version) as usize;
        let start_idx = self.history.len().saturating_sub(skip_from);
        for prior in self.history.iter().skip(start_idx) {
            let (new_op, _) = transformed
                .transform(&prior.op)
                .map_err(|e| CollabError::Transform(e.to_string()))?;
            transformed = new_op;
        }

        self.text = transformed
            .apply(&self.text)
            .map_err(|e| CollabError::Transform(e.to_string()))?;
        self.comments.map_through(&transformed);
        self.cursors.map_through(&transformed);

        let step = Step {
            client_id: client_id.to_string(),
            op: transformed,
        };
        self.history.push_back(step.clone());
        self.version += 1;
        self.dirty = true;
        self.last_active_at = Utc::now();

        if self.history.len() > MAX_STEP_HISTORY {
            self.history.pop_front();
        }

        Ok(step)
    }

    /// Steps, comment events, and (when stale) cursors a client needs to
    /// replay to catch up to the current version (§4.4 `get_events`).
    pub fn events_after(&self, from_version: u64, comment_cursor: u64, base_cursor_version: u64) -> EventsDiff {
        let skip = self.history.len().saturating_sub((self.version - from_version.min(self.version)) as usize);
        let steps = self.history.iter().skip(skip).cloned().collect();
        EventsDiff {
            steps,
            comment_events: self.comments.events_after(comment_cursor),
            version: self.version,
            cursors: self.cursors.snapshot_since(base_cursor_version),
        }
    }

    pub fn apply_comment_event(&mut self, event: CommentEventInput) {
        self.comments.apply_event(event);
        self.last_active_at = Utc::now();
    }

    pub fn update_cursor(&mut self, client_id: &str, selection: Selection) {
        self.cursors.update(client_id, selection);
        self.last_active_at = Utc::now();
    }

    /// A user joins this instance's editing session, keyed by `email`
    /// (§4.4): add an active entry if none exists yet, idempotent if the
    /// email is already active. `client_id` identifies the joining tab's
    /// cursor slot, which is reset so a reconnect doesn't see a stale caret.
    pub fn register_user(&mut self, email: &str, display_name: &str, persistent_id: Option<String>) {
        match self.users.iter_mut().find(|u| u.email == email) {
            Some(existing) if existing.active => {}
            Some(existing) => {
                existing.active = true;
                existing.display_name = display_name.to_string();
                existing.persistent_id = persistent_id;
            }
            None => self.users.push(UserEntry {
                email: email.to_string(),
                display_name: display_name.to_string(),
                persistent_id,
                active: true,
            }),
        }
        self.last_active_at = Utc::now();
    }

    /// A user's tab leaves: its cursor is cleared so it does not linger for
    /// peers, and the user's entry is deactivated, but any comments they
    /// authored remain (§4.5).
    pub fn remove_user(&mut self, email: &str, client_id: &str) {
        if let Some(entry) = self.users.iter_mut().find(|u| u.email == email) {
            entry.active = false;
        }
        self.cursors.remove(client_id);
    }

    pub fn active_user_count(&self) -> usize {
        self.users.iter().filter(|u| u.active).count()
    }

    pub fn users(&self) -> &[UserEntry] {
        &self.users
    }

    /// Compact the tail of step history with `merger` before a persist
    /// (§4.4) — does not change `version`, only the serialised form.
    pub fn compact_history(&mut self, merger: &dyn StepMerger) {
        let steps: Vec<Step> = self.history.drain(..).collect();
        self.history = compact(merger, steps).into();
    }

    pub fn history_snapshot(&self) -> Vec<Step> {
        self.history.iter().cloned().collect()
    }

    /// Build the persisted snapshot for this instance (§6 `DocumentRecordStore`).
    /// `compressed_steps` is the merged step history serialised as JSON —
    /// the field name is carried over from the storage contract even though
    /// no byte-level compression is applied. `users` is written as the
    /// subset of active entries' persistent ids (§4.5 periodic persistence).
    pub fn to_record(&self) -> Result<DocumentRecord> {
        Ok(DocumentRecord {
            doc: serde_json::to_value(&self.text).map_err(CollabError::Serialization)?,
            comments: serde_json::to_value(self.comments.live()).map_err(CollabError::Serialization)?,
            compressed_steps: serde_json::to_vec(&self.history_snapshot())
                .map_err(CollabError::Serialization)?,
            version: self.version,
            users: self
                .users
                .iter()
                .filter(|u| u.active)
                .filter_map(|u| u.persistent_id.clone())
                .collect(),
        })
    }
}
