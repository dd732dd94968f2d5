//! `Auth` (§6) — "given a bearer token, returns a user record ... The core
//! calls this once per dispatcher connection." Token *verification* itself
//! (password hashing, session signing, SSO) is named out of scope by §1; this
//! treats the bearer token as the user's row id directly and looks the rest
//! of the record up, the minimal stand-in a real verifying Auth collaborator
//! would sit in front of.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use classroom_core::collaborators::{Auth, ResolvedUser};
use classroom_core::types::Email;
use classroom_core::{ClassroomError, Result};

use crate::error::db_err;

pub struct SqliteAuth {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuth {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Auth for SqliteAuth {
    async fn resolve_token(&self, token: &str) -> Result<ResolvedUser> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, email, display_name, is_admin FROM users WHERE id = ?1",
                [token],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)? != 0,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        let (id, email, display_name, is_admin) =
            row.ok_or_else(|| ClassroomError::AuthFailed(format!("unknown token: {token}")))?;

        Ok(ResolvedUser {
            id,
            email: Email::from(email),
            display_name,
            is_admin,
        })
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
    async fn resolves_known_token_to_user_record() {
        let conn = memory_conn();
        {
            let c = conn.lock().unwrap();
            c.execute(
                "INSERT INTO users (id, email, display_name, is_admin, updated_at)
                 VALUES ('tok-1','alice@example.com','Alice',1,'2026-07-28T00:00:00Z')",
                [],
            )
            .unwrap();
        }
        let auth = SqliteAuth::new(conn);
        let resolved = auth.resolve_token("tok-1").await.unwrap();
        assert_eq!(resolved.email.as_str(), "alice@example.com");
        assert!(resolved.is_admin);
    }

    #[tokio::test]
    async fn unknown_token_fails_auth() {
        let conn = memory_conn();
        let auth = SqliteAuth::new(conn);
        assert!(matches!(
            auth.resolve_token("nope").await,
            Err(ClassroomError::AuthFailed(_))
        ));
    }
}
