use thiserror::Error;

/// Errors raised within the scheduler subsystem (C9). Per §7 the scheduler
/// swallows everything here except its own programming bugs — `run` logs
/// and moves on to the next tick rather than propagating.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("collaborator error: {0}")]
    Store(#[from] classroom_core::ClassroomError),

    #[error("malformed event payload: {0}")]
    InvalidPayload(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
