//! `classroom-scheduler` — C9 Scheduler (§4.8).
//!
//! A single periodic task scans the persisted event log for due events and
//! executes `unlock_lesson`, `send_email`, or `overview_statistics`
//! serially, marking each `done` exactly once. It has no knowledge of how
//! those events are stored or delivered — it only calls the §6 collaborator
//! traits (`LessonStore`, `EventStore`, `MetricsStore`, `Mailer`), which
//! `classroom-store` implements.

pub mod clock;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
