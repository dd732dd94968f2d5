//! This crate's own methods return `classroom_core::Result` directly (the
//! trait signatures demand it); this local alias exists only for `db.rs`'s
//! schema setup, which runs before any collaborator trait is in play.

pub type Result<T> = std::result::Result<T, rusqlite::Error>;

/// Map a rusqlite error into the shared `ClassroomError::Database` variant
/// every trait method in this crate returns (§7 transient-store-failure).
pub fn db_err(e: impl std::fmt::Display) -> classroom_core::ClassroomError {
    classroom_core::ClassroomError::Database(e.to_string())
}
