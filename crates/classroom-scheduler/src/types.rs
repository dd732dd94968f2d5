//! Type-specific `data` payload shapes for the three `ScheduledEvent`
//! variants this engine understands (§3/§4.8).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockLessonData {
    pub namespace_name: String,
    pub lesson_name: String,
}
