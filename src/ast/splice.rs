//! Positional insertion into statement and expression sequences.
//!
//! Lookups go by node identity, never by structural equality: two
//! statements that print identically are different nodes.

use super::{NodeId, Stmt};

/// Nodes that carry an identity.
pub trait Identified {
    fn node_id(&self) -> NodeId;
}

impl Identified for Stmt {
    fn node_id(&self) -> NodeId {
        self.id
    }
}

/// Insert `node` so that it ends up at `index`, shifting later elements
/// right. An index past the end appends. Returns the index used.
pub fn insert_at<T>(seq: &mut Vec<T>, index: usize, node: T) -> usize {
    let index = index.min(seq.len());
    seq.insert(index, node);
    index
}

/// Position of the node with identity `id`.
pub fn find_identity<T: Identified>(seq: &[T], id: NodeId) -> Option<usize> {
    seq.iter().position(|node| node.node_id() == id)
}

/// Insert `node` immediately before the node with identity `anchor`.
/// Returns the new node's index, or `None` (and drops nothing) when the
/// anchor is not in the sequence.
pub fn insert_before<T: Identified>(seq: &mut Vec<T>, anchor: NodeId, node: T) -> Option<usize> {
    let index = find_identity(seq, anchor)?;
    Some(insert_at(seq, index, node))
}

/// Insert `node` immediately after the node with identity `anchor`.
pub fn insert_after<T: Identified>(seq: &mut Vec<T>, anchor: NodeId, node: T) -> Option<usize> {
    let index = find_identity(seq, anchor)?;
    Some(insert_at(seq, index + 1, node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StmtKind;
    use crate::span::Span;

    fn empty(id: NodeId) -> Stmt {
        Stmt::new(id, StmtKind::Empty, Span::dummy())
    }

    fn ids(seq: &[Stmt]) -> Vec<NodeId> {
        seq.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_insert_at_shifts_right() {
        let mut seq = vec![1, 2, 3];
        assert_eq!(insert_at(&mut seq, 1, 9), 1);
        assert_eq!(seq, vec![1, 9, 2, 3]);
    }

    #[test]
    fn test_insert_at_front_and_end() {
        let mut seq = vec![1, 2];
        insert_at(&mut seq, 0, 0);
        insert_at(&mut seq, 3, 3);
        assert_eq!(seq, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_insert_at_past_end_appends() {
        let mut seq = vec![1];
        assert_eq!(insert_at(&mut seq, 10, 2), 1);
        assert_eq!(seq, vec![1, 2]);
    }

    #[test]
    fn test_identity_not_structure() {
        // All three are structurally equal; only ids tell them apart.
        let mut seq = vec![empty(1), empty(2), empty(3)];
        assert_eq!(seq[0], seq[2]);
        assert_eq!(find_identity(&seq, 3), Some(2));
        assert_eq!(insert_before(&mut seq, 3, empty(7)), Some(2));
        assert_eq!(ids(&seq), vec![1, 2, 7, 3]);
    }

    #[test]
    fn test_insert_after() {
        let mut seq = vec![empty(1), empty(2)];
        assert_eq!(insert_after(&mut seq, 2, empty(5)), Some(2));
        assert_eq!(insert_after(&mut seq, 1, empty(6)), Some(1));
        assert_eq!(ids(&seq), vec![1, 6, 2, 5]);
    }

    #[test]
    fn test_missing_anchor_leaves_sequence() {
        let mut seq = vec![empty(1)];
        assert_eq!(insert_before(&mut seq, 42, empty(2)), None);
        assert_eq!(ids(&seq), vec![1]);
    }
}
