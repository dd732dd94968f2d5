//! Schema for the three persisted tables the core owns (§6: lessons, user
//! event log, collaborative-document records), plus the small set of
//! ambient tables `MetricsStore` and `NamespaceStore` need to have
//! something concrete to count — every other persistent-store schema
//! (tickets, files, two-factor, SAML, …) is an external collaborator's
//! and is out of scope (§1).
//!
//! Grounded on `skynet-users/src/db.rs`'s `init_db` + `CREATE TABLE IF NOT
//! EXISTS` idempotent-schema convention.

use rusqlite::Connection;

use crate::error::Result;

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS lessons (
            id              TEXT PRIMARY KEY NOT NULL,
            namespace_title TEXT NOT NULL,
            lesson_title    TEXT NOT NULL,
            active          INTEGER NOT NULL DEFAULT 0,
            lock_until      TEXT,
            UNIQUE(namespace_title, lesson_title)
        );

        CREATE TABLE IF NOT EXISTS namespace_owners (
            namespace_title TEXT NOT NULL,
            user_id         TEXT NOT NULL,
            PRIMARY KEY (namespace_title, user_id)
        );

        CREATE TABLE IF NOT EXISTS scheduled_events (
            id      TEXT PRIMARY KEY NOT NULL,
            kind    TEXT NOT NULL,
            time    TEXT NOT NULL,
            data    TEXT NOT NULL DEFAULT '{}',
            done    INTEGER NOT NULL DEFAULT 0,
            user    TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_scheduled_events_due
            ON scheduled_events (done, time);

        CREATE TABLE IF NOT EXISTS documents (
            id              TEXT PRIMARY KEY NOT NULL,
            doc             TEXT NOT NULL,
            comments        TEXT NOT NULL DEFAULT '[]',
            compressed_steps BLOB NOT NULL,
            version         INTEGER NOT NULL DEFAULT 0,
            users           TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY NOT NULL,
            email        TEXT NOT NULL DEFAULT '',
            display_name TEXT NOT NULL DEFAULT '',
            role         TEXT NOT NULL DEFAULT 'student',
            is_admin     INTEGER NOT NULL DEFAULT 0,
            updated_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cohorts (id TEXT PRIMARY KEY NOT NULL);
        CREATE TABLE IF NOT EXISTS namespaces (id TEXT PRIMARY KEY NOT NULL);
        CREATE TABLE IF NOT EXISTS files (id TEXT PRIMARY KEY NOT NULL);
        CREATE TABLE IF NOT EXISTS tickets (id TEXT PRIMARY KEY NOT NULL);

        CREATE TABLE IF NOT EXISTS session_actions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            action_type     TEXT NOT NULL,
            user_id         TEXT NOT NULL,
            occurred_at     TEXT NOT NULL,
            spent_time_secs INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS overview_statistics (
            taken_at TEXT PRIMARY KEY NOT NULL,
            payload  TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}
