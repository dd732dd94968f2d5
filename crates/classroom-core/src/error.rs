use thiserror::Error;

/// Error kinds per the core's error handling design: invalid-input is a typed
/// reply to the initiating socket, not-found is a logged no-op, transient
/// store failures leave the dirty flag set for the next save tick,
/// invariant-violation rejects a whole batch, auth refuses the command, and
/// mail-failure bubbles up without ever crashing the scheduler.
#[derive(Debug, Error)]
pub enum ClassroomError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Mail delivery error: {0}")]
    MailFailure(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClassroomError {
    /// Short error code string sent to clients in error-reply frames.
    pub fn code(&self) -> &'static str {
        match self {
            ClassroomError::Config(_) => "CONFIG_ERROR",
            ClassroomError::AuthFailed(_) => "AUTH_FAILED",
            ClassroomError::PermissionDenied { .. } => "PERMISSION_DENIED",
            ClassroomError::InvalidInput(_) => "INVALID_INPUT",
            ClassroomError::NotFound(_) => "NOT_FOUND",
            ClassroomError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            ClassroomError::Database(_) => "DATABASE_ERROR",
            ClassroomError::MailFailure(_) => "MAIL_FAILURE",
            ClassroomError::Serialization(_) => "SERIALIZATION_ERROR",
            ClassroomError::Io(_) => "IO_ERROR",
            ClassroomError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ClassroomError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for the kinds §7 classifies as safe no-ops rather than aborts.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClassroomError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ClassroomError>;
