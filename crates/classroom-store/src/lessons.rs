//! `LessonStore` and `NamespaceStore` (§6) — the scheduler's `unlock_lesson`
//! handler and the gateway's owner-status check are the only consumers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use classroom_core::collaborators::{LessonRecord, LessonStore, NamespaceStore};
use classroom_core::{ClassroomError, Result};

use crate::error::db_err;

pub struct SqliteLessonStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLessonStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn row_to_lesson(row: &rusqlite::Row<'_>) -> rusqlite::Result<LessonRecord> {
    let lock_until: Option<String> = row.get(4)?;
    Ok(LessonRecord {
        id: row.get(0)?,
        namespace_id: row.get(1)?,
        title: row.get(2)?,
        active: row.get::<_, i64>(3)? != 0,
        lock_until: lock_until.and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|d| d.with_timezone(&Utc))),
    })
}

#[async_trait]
impl LessonStore for SqliteLessonStore {
    async fn find_lesson(&self, namespace_title: &str, lesson_title: &str) -> Result<Option<LessonRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, namespace_title, lesson_title, active, lock_until
             FROM lessons WHERE namespace_title = ?1 AND lesson_title = ?2",
            rusqlite::params![namespace_title, lesson_title],
            row_to_lesson,
        )
        .optional()
        .map_err(db_err)
    }

    async fn set_lesson_active(&self, id: &str, active: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn
            .execute(
                "UPDATE lessons SET active = ?1 WHERE id = ?2",
                rusqlite::params![active as i64, id],
            )
            .map_err(db_err)?;
        if n == 0 {
            return Err(ClassroomError::NotFound(format!("lesson {id}")));
        }
        Ok(())
    }

    async fn clear_lock_until(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("UPDATE lessons SET lock_until = NULL WHERE id = ?1", [id])
            .map_err(db_err)?;
        Ok(())
    }
}

pub struct SqliteNamespaceStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteNamespaceStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl NamespaceStore for SqliteNamespaceStore {
    async fn is_owner(&self, user_id: &str, namespace_title: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM namespace_owners WHERE namespace_title = ?1 AND user_id = ?2",
                rusqlite::params![namespace_title, user_id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count > 0)
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
    async fn unlock_lesson_round_trips_active_and_lock_until() {
        let conn = memory_conn();
        {
            let c = conn.lock().unwrap();
            c.execute(
                "INSERT INTO lessons (id, namespace_title, lesson_title, active, lock_until)
                 VALUES ('lesson-1','algebra-101','linear-equations',0,'2026-07-28T12:00:00Z')",
                [],
            )
            .unwrap();
        }
        let store = SqliteLessonStore::new(conn);
        let lesson = store
            .find_lesson("algebra-101", "linear-equations")
            .await
            .unwrap()
            .unwrap();
        assert!(!lesson.active);
        assert!(lesson.lock_until.is_some());

        store.set_lesson_active(&lesson.id, true).await.unwrap();
        store.clear_lock_until(&lesson.id).await.unwrap();

        let refreshed = store
            .find_lesson("algebra-101", "linear-equations")
            .await
            .unwrap()
            .unwrap();
        assert!(refreshed.active);
        assert!(refreshed.lock_until.is_none());
    }

    #[tokio::test]
    async fn is_owner_reflects_namespace_owners_table() {
        let conn = memory_conn();
        {
            let c = conn.lock().unwrap();
            c.execute(
                "INSERT INTO namespace_owners (namespace_title, user_id) VALUES ('algebra-101','user-1')",
                [],
            )
            .unwrap();
        }
        let store = SqliteNamespaceStore::new(conn);
        assert!(store.is_owner("user-1", "algebra-101").await.unwrap());
        assert!(!store.is_owner("user-2", "algebra-101").await.unwrap());
    }
}
