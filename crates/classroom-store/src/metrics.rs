//! `MetricsStore` (§6) — backs the scheduler's `overview_statistics`
//! handler. The tables it counts from (users, cohorts, namespaces, files,
//! tickets, per-action session log) belong to subsystems named out of
//! scope by §1 (ticket/badge administration, per-request statistics); this
//! crate only needs enough of a schema to make the named collaborator
//! methods concrete.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use classroom_core::collaborators::{ActionTypeCounts, MetricsStore, OverviewStatisticsRow};
use classroom_core::Result;

use crate::error::db_err;

pub struct SqliteMetricsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetricsStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn count(&self, table: &str) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(n as u64)
    }
}

#[async_trait]
impl MetricsStore for SqliteMetricsStore {
    async fn count_users(&self) -> Result<u64> {
        self.count("users")
    }

    async fn count_instructors(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'owner'",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(n as u64)
    }

    async fn count_lessons(&self) -> Result<u64> {
        self.count("lessons")
    }

    async fn count_cohorts(&self) -> Result<u64> {
        self.count("cohorts")
    }

    async fn count_namespaces(&self) -> Result<u64> {
        self.count("namespaces")
    }

    async fn count_events(&self) -> Result<u64> {
        self.count("scheduled_events")
    }

    async fn count_files(&self) -> Result<u64> {
        self.count("files")
    }

    async fn count_tickets(&self) -> Result<u64> {
        self.count("tickets")
    }

    /// Windows are measured against `users.updated_at` (§4.8: "active-user
    /// windows ... based on user's updatedAt").
    async fn active_user_counts(&self, now: DateTime<Utc>) -> Result<(u64, u64, u64, u64)> {
        let conn = self.conn.lock().unwrap();
        let since = |window: Duration| -> rusqlite::Result<i64> {
            let cutoff = (now - window).to_rfc3339();
            conn.query_row(
                "SELECT COUNT(*) FROM users WHERE updated_at >= ?1",
                [cutoff],
                |row| row.get(0),
            )
        };
        let hour = since(Duration::hours(1)).map_err(db_err)?;
        let day = since(Duration::days(1)).map_err(db_err)?;
        let week = since(Duration::weeks(1)).map_err(db_err)?;
        let month = since(Duration::days(30)).map_err(db_err)?;
        Ok((hour as u64, day as u64, week as u64, month as u64))
    }

    async fn aggregate_action_types(&self) -> Result<ActionTypeCounts> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT action_type, COUNT(*) FROM session_actions GROUP BY action_type")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(db_err)?;
        let mut counts = HashMap::new();
        for row in rows {
            let (action_type, n) = row.map_err(db_err)?;
            counts.insert(action_type, n as u64);
        }
        Ok(ActionTypeCounts { counts })
    }

    async fn total_spent_time_secs(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let total: Option<i64> = conn
            .query_row("SELECT SUM(spent_time_secs) FROM session_actions", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(total.unwrap_or(0) as u64)
    }

    async fn insert_overview_statistics(&self, row: &OverviewStatisticsRow) -> Result<()> {
        let payload = serde_json::to_string(row)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO overview_statistics (taken_at, payload) VALUES (?1, ?2)",
            rusqlite::params![row.taken_at.to_rfc3339(), payload],
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
    async fn active_user_counts_respects_window_boundaries() {
        let conn = memory_conn();
        let now = Utc::now();
        {
            let c = conn.lock().unwrap();
            c.execute(
                "INSERT INTO users (id, role, updated_at) VALUES ('recent','student',?1)",
                [(now - Duration::minutes(10)).to_rfc3339()],
            )
            .unwrap();
            c.execute(
                "INSERT INTO users (id, role, updated_at) VALUES ('stale','student',?1)",
                [(now - Duration::days(60)).to_rfc3339()],
            )
            .unwrap();
        }
        let store = SqliteMetricsStore::new(conn);
        let (hour, day, week, month) = store.active_user_counts(now).await.unwrap();
        assert_eq!(hour, 1);
        assert_eq!(day, 1);
        assert_eq!(week, 1);
        assert_eq!(month, 1);
        assert_eq!(store.count_users().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn aggregate_action_types_groups_by_type() {
        let conn = memory_conn();
        {
            let c = conn.lock().unwrap();
            for (action, spent) in [("edit", 30), ("edit", 15), ("chat", 5)] {
                c.execute(
                    "INSERT INTO session_actions (action_type, user_id, occurred_at, spent_time_secs)
                     VALUES (?1, 'u1', '2026-07-28T00:00:00Z', ?2)",
                    rusqlite::params![action, spent],
                )
                .unwrap();
            }
        }
        let store = SqliteMetricsStore::new(conn);
        let counts = store.aggregate_action_types().await.unwrap();
        assert_eq!(counts.counts.get("edit"), Some(&2));
        assert_eq!(counts.counts.get("chat"), Some(&1));
        assert_eq!(store.total_spent_time_secs().await.unwrap(), 50);
    }
}
