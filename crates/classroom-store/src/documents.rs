//! `DocumentRecordStore` (§6) — the collaborative-document table that
//! `classroom-collab::InstanceRegistry` loads from and saves to.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use classroom_core::collaborators::{DocumentRecord, DocumentRecordStore};
use classroom_core::Result;

use crate::error::db_err;

pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let doc_str: String = row.get(0)?;
    let comments_str: String = row.get(1)?;
    let users_str: String = row.get(3)?;
    Ok(DocumentRecord {
        doc: serde_json::from_str(&doc_str).unwrap_or(serde_json::Value::Null),
        comments: serde_json::from_str(&comments_str).unwrap_or(serde_json::Value::Array(vec![])),
        compressed_steps: row.get(2)?,
        version: row.get::<_, i64>(4)? as u64,
        users: serde_json::from_str(&users_str).unwrap_or_default(),
    })
}

#[async_trait]
impl DocumentRecordStore for SqliteDocumentStore {
    async fn load(
        &self,
        namespace_id: &str,
        lesson_id: &str,
        component_id: &str,
    ) -> Result<Option<DocumentRecord>> {
        let id = classroom_core::types::DocumentId::new(namespace_id, lesson_id, component_id);
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT doc, comments, compressed_steps, users, version FROM documents WHERE id = ?1",
            [id.as_str()],
            row_to_record,
        )
        .optional()
        .map_err(db_err)
    }

    async fn save(&self, id: &str, payload: &DocumentRecord) -> Result<()> {
        let doc_str = serde_json::to_string(&payload.doc)?;
        let comments_str = serde_json::to_string(&payload.comments)?;
        let users_str = serde_json::to_string(&payload.users)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO documents (id, doc, comments, compressed_steps, version, users)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(id) DO UPDATE SET
                doc = excluded.doc,
                comments = excluded.comments,
                compressed_steps = excluded.compressed_steps,
                version = excluded.version,
                users = excluded.users",
            rusqlite::params![id, doc_str, comments_str, payload.compressed_steps, payload.version as i64, users_str],
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
    async fn save_then_load_round_trips() {
        let conn = memory_conn();
        let store = SqliteDocumentStore::new(conn);
        let id = classroom_core::types::DocumentId::new("ns1", "lesson7", "editor");
        let record = DocumentRecord {
            doc: serde_json::json!("hello"),
            comments: serde_json::json!([]),
            compressed_steps: vec![1, 2, 3],
            version: 4,
            users: vec!["alice".into()],
        };
        store.save(id.as_str(), &record).await.unwrap();

        let loaded = store.load("ns1", "lesson7", "editor").await.unwrap().unwrap();
        assert_eq!(loaded.version, 4);
        assert_eq!(loaded.compressed_steps, vec![1, 2, 3]);
        assert_eq!(loaded.users, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn load_missing_document_returns_none() {
        let conn = memory_conn();
        let store = SqliteDocumentStore::new(conn);
        assert!(store.load("ns1", "lesson7", "editor").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_existing_snapshot() {
        let conn = memory_conn();
        let store = SqliteDocumentStore::new(conn);
        let id = classroom_core::types::DocumentId::new("ns1", "lesson7", "editor");
        let mut record = DocumentRecord {
            doc: serde_json::json!("v1"),
            comments: serde_json::json!([]),
            compressed_steps: vec![],
            version: 1,
            users: vec![],
        };
        store.save(id.as_str(), &record).await.unwrap();
        record.doc = serde_json::json!("v2");
        record.version = 2;
        store.save(id.as_str(), &record).await.unwrap();

        let loaded = store.load("ns1", "lesson7", "editor").await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.doc, serde_json::json!("v2"));
    }
}
