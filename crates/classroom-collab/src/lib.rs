//! `classroom-collab` — C3 Comments/Cursors, C4 Document Instance, C5
//! Instance Registry (§4.3–§4.5). Owns the `operational-transform`
//! dependency end to end; nothing outside this crate ever touches an
//! `OperationSeq` directly.

pub mod comments;
pub mod cursors;
pub mod error;
pub mod instance;
pub mod merge;
pub mod ot;
pub mod registry;

pub use comments::{Comment, CommentEventInput, Comments, OutCommentEvent};
pub use cursors::{Cursors, Selection};
pub use error::{CollabError, Result};
pub use instance::{AddEventsResult, DocumentInstance, EventsDiff, Step, UserEntry};
pub use merge::{compact, SameClientMerger, StepMerger};
pub use registry::{InstanceHandle, InstanceRegistry, SeedFn};
