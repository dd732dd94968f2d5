//! C3 Cursors — per-user caret/selection, keyed by client id (§4.3).

use std::collections::HashMap;

use operational_transform::OperationSeq;
use serde::{Deserialize, Serialize};

use crate::ot::{transform_index, Bias};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub ranges: Vec<(u32, u32)>,
}

/// Live cursor set with its own monotonic version, bumped on every update
/// so a joining client can ask "send me the cursors as of version N".
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Cursors {
    by_client: HashMap<String, Selection>,
    version: u64,
}

impl Cursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, client_id: &str) -> Option<&Selection> {
        self.by_client.get(client_id)
    }

    pub fn all(&self) -> impl Iterator<Item = (&String, &Selection)> {
        self.by_client.iter()
    }

    /// Bulk read gated on `base_version` (§4.3 `Cursors.get(version)`):
    /// the full cursor map when the caller is behind the current version,
    /// `None` when it is already caught up.
    pub fn snapshot_since(&self, base_version: u64) -> Option<HashMap<String, Selection>> {
        if base_version < self.version {
            Some(self.by_client.clone())
        } else {
            None
        }
    }

    pub fn update(&mut self, client_id: &str, selection: Selection) {
        self.by_client.insert(client_id.to_string(), selection);
        self.version += 1;
    }

    /// A disconnecting client's caret must not linger for peers (§4.5).
    pub fn remove(&mut self, client_id: &str) {
        if self.by_client.remove(client_id).is_some() {
            self.version += 1;
        }
    }

    /// Remap every selection through `op`; ranges collapse the same way
    /// comment ranges do (`from` biases right, `to` biases left — §4.3).
    pub fn map_through(&mut self, op: &OperationSeq) {
        for selection in self.by_client.values_mut() {
            for range in &mut selection.ranges {
                range.0 = transform_index(op, range.0, Bias::Right);
                range.1 = transform_index(op, range.1, Bias::Left);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_then_remove_bumps_version_each_time() {
        let mut cursors = Cursors::new();
        cursors.update(
            "alice",
            Selection {
                ranges: vec![(3, 3)],
            },
        );
        assert_eq!(cursors.version(), 1);
        cursors.remove("alice");
        assert_eq!(cursors.version(), 2);
        assert!(cursors.get("alice").is_none());
    }

    #[test]
    fn removing_absent_client_does_not_bump_version() {
        let mut cursors = Cursors::new();
        cursors.remove("nobody");
        assert_eq!(cursors.version(), 0);
    }

    #[test]
    fn snapshot_since_gates_on_version() {
        let mut cursors = Cursors::new();
        cursors.update(
            "alice",
            Selection {
                ranges: vec![(1, 1)],
            },
        );
        assert!(cursors.snapshot_since(0).is_some());
        assert!(cursors.snapshot_since(1).is_none());
    }

    #[test]
    fn map_through_shifts_caret_past_insert() {
        let mut cursors = Cursors::new();
        cursors.update(
            "alice",
            Selection {
                ranges: vec![(5, 5)],
            },
        );
        let mut op = OperationSeq::default();
        op.retain(5);
        op.insert("hi");
        op.retain(100);
        cursors.map_through(&op);
        assert_eq!(cursors.get("alice").unwrap().ranges[0], (7, 7));
    }
}
