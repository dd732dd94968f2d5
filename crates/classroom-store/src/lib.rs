//! SQLite-backed implementations of the `classroom-core::collaborators`
//! traits (§6): `LessonStore`, `NamespaceStore`, `EventStore`,
//! `DocumentRecordStore`, `MetricsStore`, and a logging `Mailer`.
//!
//! Grounded on `skynet-users/src/db.rs` and `skynet-memory/src/manager.rs`'s
//! `Arc<Mutex<Connection>>`-sharing convention: one connection, one schema,
//! handed out to several narrow store structs rather than one god object.

mod auth;
mod db;
mod documents;
mod error;
mod events;
mod lessons;
mod mailer;
mod metrics;

pub use auth::SqliteAuth;
pub use documents::SqliteDocumentStore;
pub use events::SqliteEventStore;
pub use lessons::{SqliteLessonStore, SqliteNamespaceStore};
pub use mailer::LoggingMailer;
pub use metrics::SqliteMetricsStore;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use error::db_err;

/// Opens (or creates) a SQLite database at `path`, runs schema setup, and
/// returns every store struct the gateway needs, all sharing one
/// connection under one lock — mirrors the teacher's single-connection,
/// several-stores layout rather than a pool per table.
pub struct Store {
    pub lessons: SqliteLessonStore,
    pub namespaces: SqliteNamespaceStore,
    pub events: SqliteEventStore,
    pub documents: SqliteDocumentStore,
    pub metrics: SqliteMetricsStore,
    pub mailer: LoggingMailer,
    pub auth: SqliteAuth,
}

impl Store {
    pub fn open(path: &str) -> classroom_core::Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> classroom_core::Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> classroom_core::Result<Self> {
        db::init_db(&conn).map_err(db_err)?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            lessons: SqliteLessonStore::new(conn.clone()),
            namespaces: SqliteNamespaceStore::new(conn.clone()),
            events: SqliteEventStore::new(conn.clone()),
            documents: SqliteDocumentStore::new(conn.clone()),
            metrics: SqliteMetricsStore::new(conn.clone()),
            mailer: LoggingMailer::new(),
            auth: SqliteAuth::new(conn),
        })
    }
}
