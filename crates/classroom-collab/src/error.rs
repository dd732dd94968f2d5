use thiserror::Error;

/// Errors raised within the collaborative-document subsystem (C3/C4/C5).
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A step failed to apply — whole `add_events` batch must be rejected
    /// and the client resyncs (§7 invariant-violation).
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("OT transform failed: {0}")]
    Transform(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage collaborator error: {0}")]
    Store(#[from] classroom_core::ClassroomError),
}

pub type Result<T> = std::result::Result<T, CollabError>;
