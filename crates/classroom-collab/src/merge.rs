//! Step-history compaction (§4.4). Persisted history only needs to be
//! replayable, not every intermediate keystroke, so contiguous steps from
//! the same client collapse into one composed step before being written out.

use operational_transform::OperationSeq;

use crate::instance::Step;

/// Narrow seam so the merge policy can be swapped without touching
/// `DocumentInstance` — today only contiguous-same-client runs merge; a
/// time-windowed policy could implement this same trait later.
pub trait StepMerger {
    /// Attempt to fold `next` onto the tail of `steps`, in place. Returns
    /// `true` if a merge happened (caller should not push `next` itself).
    fn try_merge(&self, steps: &mut [Step], next: &Step) -> bool;
}

#[derive(Debug, Default)]
pub struct SameClientMerger;

impl StepMerger for SameClientMerger {
    fn try_merge(&self, steps: &mut [Step], next: &Step) -> bool {
        let Some(last) = steps.last_mut() else {
            return false;
        };
        if last.client_id != next.client_id {
            return false;
        }
        match last.op.compose(&next.op) {
            Ok(composed) => {
                last.op = composed;
                true
            }
            Err(_) => false,
        }
    }
}

/// Compact `steps` in place by folding every mergeable run via `merger`.
pub fn compact(merger: &dyn StepMerger, steps: Vec<Step>) -> Vec<Step> {
    let mut out: Vec<Step> = Vec::with_capacity(steps.len());
    for step in steps {
        if !out.is_empty() && merger.try_merge(&mut out, &step) {
            continue;
        }
        out.push(step);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(client: &str, op: OperationSeq) -> Step {
        Step {
            client_id: client.to_string(),
            op,
        }
    }

    #[test]
    fn contiguous_same_client_steps_collapse_to_one() {
        let mut a = OperationSeq::default();
        a.insert("a");
        let mut b = OperationSeq::default();
        b.retain(1);
        b.insert("b");

        let steps = vec![step("alice", a), step("alice", b)];
        let compacted = compact(&SameClientMerger, steps);
        assert_eq!(compacted.len(), 1);
        assert_eq!(compacted[0].client_id, "alice");
    }

    #[test]
    fn steps_from_different_clients_do_not_merge() {
        let mut a = OperationSeq::default();
        a.insert("a");
        let mut b = OperationSeq::default();
        b.retain(1);
        b.insert("b");

        let steps = vec![step("alice", a), step("bob", b)];
        let compacted = compact(&SameClientMerger, steps);
        assert_eq!(compacted.len(), 2);
    }
}
