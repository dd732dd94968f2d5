//! Contracts for the external collaborators the core consults (§6). Every
//! trait here is implemented against real storage/mail in `classroom-store`;
//! the core itself only ever depends on these signatures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Email;

/// A resolved, signed-in user — the result of verifying a bearer token.
/// The core never sees the token itself, only this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedUser {
    pub id: String,
    pub email: Email,
    pub display_name: String,
    pub is_admin: bool,
}

#[async_trait]
pub trait Auth: Send + Sync {
    async fn resolve_token(&self, token: &str) -> Result<ResolvedUser>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonRecord {
    pub id: String,
    pub namespace_id: String,
    pub title: String,
    pub active: bool,
    pub lock_until: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait LessonStore: Send + Sync {
    async fn find_lesson(&self, namespace_title: &str, lesson_title: &str) -> Result<Option<LessonRecord>>;
    async fn set_lesson_active(&self, id: &str, active: bool) -> Result<()>;
    async fn clear_lock_until(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait NamespaceStore: Send + Sync {
    async fn is_owner(&self, user_id: &str, namespace_title: &str) -> Result<bool>;
}

/// A scheduled event as persisted by the event log (§3/§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub kind: EventKind,
    pub time: DateTime<Utc>,
    pub data: serde_json::Value,
    pub done: bool,
    pub user: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UnlockLesson,
    SendEmail,
    OverviewStatistics,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn query_due_events(&self, now: DateTime<Utc>) -> Result<Vec<EventRecord>>;
    async fn mark_done(&self, event_id: &str) -> Result<()>;
    async fn insert(&self, event: &EventRecord) -> Result<()>;
}

/// Persisted shape of a Document Instance snapshot (§6 — the three tables
/// the core reads/writes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc: serde_json::Value,
    pub comments: serde_json::Value,
    pub compressed_steps: Vec<u8>,
    pub version: u64,
    pub users: Vec<String>,
}

#[async_trait]
pub trait DocumentRecordStore: Send + Sync {
    async fn load(
        &self,
        namespace_id: &str,
        lesson_id: &str,
        component_id: &str,
    ) -> Result<Option<DocumentRecord>>;
    async fn save(&self, id: &str, payload: &DocumentRecord) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionTypeCounts {
    pub counts: std::collections::HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewStatisticsRow {
    pub taken_at: DateTime<Utc>,
    pub user_count: u64,
    pub instructor_count: u64,
    pub lesson_count: u64,
    pub cohort_count: u64,
    pub namespace_count: u64,
    pub event_count: u64,
    pub file_count: u64,
    pub ticket_count: u64,
    pub active_last_hour: u64,
    pub active_last_day: u64,
    pub active_last_week: u64,
    pub active_last_month: u64,
    pub action_type_counts: ActionTypeCounts,
    pub total_spent_time_secs: u64,
}

#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn count_users(&self) -> Result<u64>;
    async fn count_instructors(&self) -> Result<u64>;
    async fn count_lessons(&self) -> Result<u64>;
    async fn count_cohorts(&self) -> Result<u64>;
    async fn count_namespaces(&self) -> Result<u64>;
    async fn count_events(&self) -> Result<u64>;
    async fn count_files(&self) -> Result<u64>;
    async fn count_tickets(&self) -> Result<u64>;
    async fn active_user_counts(&self, now: DateTime<Utc>) -> Result<(u64, u64, u64, u64)>;
    async fn aggregate_action_types(&self) -> Result<ActionTypeCounts>;
    async fn total_spent_time_secs(&self) -> Result<u64>;
    async fn insert_overview_statistics(&self, row: &OverviewStatisticsRow) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Fire-and-forget send; retries are the mail layer's responsibility
    /// (§1 Non-goals, §7 mail-failure).
    async fn send(&self, mail: Mail) -> Result<()>;
}
