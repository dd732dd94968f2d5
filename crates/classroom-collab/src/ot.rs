//! Index transform for comment/cursor positions, ported rustpad-style from
//! its `ot` module (SPEC_FULL §C) rather than hand-rolled from scratch: walk
//! the operation's components, tracking how far we've consumed the old
//! document versus how far we've advanced in the new one.

use operational_transform::{Operation, OperationSeq};

/// Which side of a tie an index sticks to when an insert lands exactly on
/// it. `Comments.map_through`/`Cursors.map_through` apply `Right` to a
/// range's `from` (the start expands to swallow text typed right at it)
/// and `Left` to `to` (the end does not swallow a trailing insert) per §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Left,
    Right,
}

/// Map `position` (an index into the document *before* `op` was applied)
/// through `op`, returning its index in the document *after*.
pub fn transform_index(op: &OperationSeq, position: u32, bias: Bias) -> u32 {
    let mut old_consumed: i64 = 0;
    let mut new_pos: i64 = 0;
    let target = position as i64;

    for component in op.ops() {
        if old_consumed > target {
            break;
        }
        match component {
            Operation::Retain(n) => {
                let n = *n as i64;
                if old_consumed + n > target {
                    new_pos += target - old_consumed;
                    return new_pos.max(0) as u32;
                }
                old_consumed += n;
                new_pos += n;
            }
            Operation::Insert(s) => {
                let len = s.chars().count() as i64;
                if old_consumed == target {
                    match bias {
                        Bias::Right => {
                            new_pos += len;
                            return new_pos.max(0) as u32;
                        }
                        Bias::Left => {
                            return new_pos.max(0) as u32;
                        }
                    }
                }
                new_pos += len;
            }
            Operation::Delete(n) => {
                let n = *n as i64;
                if old_consumed + n > target {
                    // The position fell inside a deleted span — collapse to
                    // the start of the deletion.
                    return new_pos.max(0) as u32;
                }
                old_consumed += n;
            }
        }
    }

    new_pos += target - old_consumed;
    new_pos.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_position_shifts_it_right() {
        let mut op = OperationSeq::default();
        op.retain(5);
        op.insert("XYZ");
        op.retain(5); // base_len = 10
        assert_eq!(transform_index(&op, 10, Bias::Right), 13);
        assert_eq!(transform_index(&op, 2, Bias::Right), 2);
    }

    #[test]
    fn delete_collapses_positions_inside_span() {
        let mut op = OperationSeq::default();
        op.retain(2);
        op.delete(3);
        op.retain(5); // base_len = 10
        assert_eq!(transform_index(&op, 4, Bias::Right), 2);
        assert_eq!(transform_index(&op, 9, Bias::Right), 6);
    }
}
