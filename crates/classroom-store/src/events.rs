//! `EventStore` (§6) — backs the scheduler's due-event scan and its own
//! follow-up inserts (e.g. `overview_statistics` rescheduling itself).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use classroom_core::collaborators::{EventKind, EventRecord, EventStore};
use classroom_core::Result;

use crate::error::db_err;

pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn kind_to_str(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::UnlockLesson => "unlock_lesson",
        EventKind::SendEmail => "send_email",
        EventKind::OverviewStatistics => "overview_statistics",
    }
}

fn str_to_kind(s: &str) -> Option<EventKind> {
    match s {
        "unlock_lesson" => Some(EventKind::UnlockLesson),
        "send_email" => Some(EventKind::SendEmail),
        "overview_statistics" => Some(EventKind::OverviewStatistics),
        _ => None,
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<EventRecord>> {
    let kind_str: String = row.get(1)?;
    let Some(kind) = str_to_kind(&kind_str) else {
        return Ok(None);
    };
    let time_str: String = row.get(2)?;
    let Ok(time) = DateTime::parse_from_rfc3339(&time_str) else {
        return Ok(None);
    };
    let data_str: String = row.get(3)?;
    let data = serde_json::from_str(&data_str).unwrap_or(serde_json::Value::Null);
    Ok(Some(EventRecord {
        id: row.get(0)?,
        kind,
        time: time.with_timezone(&Utc),
        data,
        done: row.get::<_, i64>(4)? != 0,
        user: row.get(5)?,
    }))
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn query_due_events(&self, now: DateTime<Utc>) -> Result<Vec<EventRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, kind, time, data, done, user FROM scheduled_events
                 WHERE done = 0 AND time < ?1 ORDER BY time",
            )
            .map_err(db_err)?;
        let events = stmt
            .query_map([now.to_rfc3339()], row_to_event)
            .map_err(db_err)?
            .filter_map(|r| r.ok().flatten())
            .collect();
        Ok(events)
    }

    async fn mark_done(&self, event_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE scheduled_events SET done = 1 WHERE id = ?1",
            [event_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert(&self, event: &EventRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let data_str = serde_json::to_string(&event.data)?;
        conn.execute(
            "INSERT INTO scheduled_events (id, kind, time, data, done, user)
             VALUES (?1,?2,?3,?4,?5,?6)",
            rusqlite::params![
                event.id,
                kind_to_str(&event.kind),
                event.time.to_rfc3339(),
                data_str,
                event.done as i64,
                event.user,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn memory_conn() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[tokio::test]
    async fn due_events_exclude_future_and_done() {
        let conn = memory_conn();
        let store = SqliteEventStore::new(conn);
        let t0 = DateTime::parse_from_rfc3339("2026-07-28T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        store
            .insert(&EventRecord {
                id: "past".into(),
                kind: EventKind::UnlockLesson,
                time: t0 - chrono::Duration::seconds(60),
                data: serde_json::json!({}),
                done: false,
                user: None,
            })
            .await
            .unwrap();
        store
            .insert(&EventRecord {
                id: "future".into(),
                kind: EventKind::UnlockLesson,
                time: t0 + chrono::Duration::seconds(60),
                data: serde_json::json!({}),
                done: false,
                user: None,
            })
            .await
            .unwrap();

        let due = store.query_due_events(t0).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "past");

        store.mark_done("past").await.unwrap();
        let due_after = store.query_due_events(t0).await.unwrap();
        assert!(due_after.is_empty());
    }
}
