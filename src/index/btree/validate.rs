//! Full structural check of a tree.
//!
//! Walks every node from the root and reports the first broken invariant as
//! [`Error::InvariantViolation`]. Tests run it after every mutation; it is
//! not on any hot path.

use crate::common::{Error, Key, NodeId, Result};
use crate::index::btree::node::NodeBody;
use crate::index::btree::BTree;

/// Accumulated while walking the tree.
#[derive(Default)]
struct Walk {
    /// Leaves in key order.
    leaves: Vec<NodeId>,
    leaf_depth: Option<usize>,
    records: usize,
    visited: usize,
}

fn violation(msg: String) -> Error {
    Error::InvariantViolation(msg)
}

fn strictly_ascending<T: PartialOrd>(items: impl Iterator<Item = T>) -> bool {
    let mut prev: Option<T> = None;
    for item in items {
        if let Some(p) = &prev {
            if *p >= item {
                return false;
            }
        }
        prev = Some(item);
    }
    true
}

impl BTree {
    /// Check every structural invariant.
    ///
    /// - the root has no parent; an internal root holds at least one key
    /// - every child points back at its parent
    /// - keys and records are strictly ascending
    /// - `children.len() == keys.len() + 1` for internal nodes
    /// - every key lies within the range its ancestors' separators allow
    /// - no node overflows, no non-root node underflows
    /// - all leaves sit at the same depth
    /// - the leaf chain visits the leaves in key order, in both directions
    /// - every live node is reachable and the record count matches
    ///
    /// # Errors
    /// - `Error::InvariantViolation` describing the first failure
    pub fn validate(&self) -> Result<()> {
        let root = self
            .arena
            .get(self.root)
            .ok_or_else(|| violation(format!("root {} is dangling", self.root)))?;
        if root.parent.is_some() {
            return Err(violation(format!("root {} has a parent", self.root)));
        }
        if !root.is_leaf() && root.keys().is_empty() {
            return Err(violation(format!("internal root {} has no keys", self.root)));
        }

        let mut walk = Walk::default();
        self.validate_node(self.root, None, None, 0, &mut walk)?;

        if walk.visited != self.arena.len() {
            return Err(violation(format!(
                "{} live nodes but {} reachable from the root",
                self.arena.len(),
                walk.visited
            )));
        }
        if walk.records != self.len {
            return Err(violation(format!(
                "tree counts {} records but leaves hold {}",
                self.len, walk.records
            )));
        }

        self.validate_leaf_chain(&walk.leaves)
    }

    fn validate_node(
        &self,
        id: NodeId,
        lower: Option<Key>,
        upper: Option<Key>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        let node = self
            .arena
            .get(id)
            .ok_or_else(|| violation(format!("{} is dangling", id)))?;
        walk.visited += 1;

        if node.is_overflowing(self.max_degree) {
            return Err(violation(format!("{} overflows with {}", id, node.occupancy())));
        }
        if node.is_underflowing(self.max_degree) {
            return Err(violation(format!("{} underflows with {}", id, node.occupancy())));
        }

        let in_range =
            |key: Key| lower.map_or(true, |lo| key >= lo) && upper.map_or(true, |hi| key < hi);

        match &node.body {
            NodeBody::Leaf { data } => {
                if !strictly_ascending(data.iter().map(|r| r.key)) {
                    return Err(violation(format!("{} records out of order", id)));
                }
                if let Some(r) = data.iter().find(|r| !in_range(r.key)) {
                    return Err(violation(format!(
                        "{} holds {} outside [{:?}, {:?})",
                        id, r.key, lower, upper
                    )));
                }
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(d) if d != depth => {
                        return Err(violation(format!("{} at depth {}, expected {}", id, depth, d)));
                    }
                    Some(_) => {}
                }
                walk.records += data.len();
                walk.leaves.push(id);
            }
            NodeBody::Internal { keys, children } => {
                if node.next.is_some() || node.previous.is_some() {
                    return Err(violation(format!("internal {} is on the leaf chain", id)));
                }
                if children.len() != keys.len() + 1 {
                    return Err(violation(format!(
                        "{} has {} keys but {} children",
                        id,
                        keys.len(),
                        children.len()
                    )));
                }
                if !strictly_ascending(keys.iter()) {
                    return Err(violation(format!("{} keys out of order", id)));
                }
                if let Some(k) = keys.iter().find(|&&k| !in_range(k)) {
                    return Err(violation(format!(
                        "{} separator {} outside [{:?}, {:?})",
                        id, k, lower, upper
                    )));
                }

                for (i, &child) in children.iter().enumerate() {
                    let parent = self.arena.get(child).and_then(|c| c.parent);
                    if parent != Some(id) {
                        return Err(violation(format!(
                            "{} is a child of {} but points at {:?}",
                            child, id, parent
                        )));
                    }
                    let lo = if i == 0 { lower } else { Some(keys[i - 1]) };
                    let hi = keys.get(i).copied().or(upper);
                    self.validate_node(child, lo, hi, depth + 1, walk)?;
                }
            }
        }

        Ok(())
    }

    fn validate_leaf_chain(&self, leaves: &[NodeId]) -> Result<()> {
        let mut expected_previous = None;
        for (i, &leaf) in leaves.iter().enumerate() {
            let node = &self.arena[leaf];
            if node.previous != expected_previous {
                return Err(violation(format!(
                    "{} links back to {:?}, expected {:?}",
                    leaf, node.previous, expected_previous
                )));
            }
            let expected_next = leaves.get(i + 1).copied();
            if node.next != expected_next {
                return Err(violation(format!(
                    "{} links forward to {:?}, expected {:?}",
                    leaf, node.next, expected_next
                )));
            }
            expected_previous = Some(leaf);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(max_degree: usize, keys: &[Key]) -> BTree {
        let mut tree = BTree::new(max_degree);
        for &k in keys {
            tree.upsert(k, k).unwrap();
        }
        tree
    }

    #[test]
    fn test_valid_trees_pass() {
        BTree::new(3).validate().unwrap();
        build(3, &[5, 2, 1, 4, 6, 7, 8, 3]).validate().unwrap();
        build(7, &(0..200).rev().collect::<Vec<_>>()).validate().unwrap();
    }

    #[test]
    fn test_detects_broken_parent_pointer() {
        let mut tree = build(3, &[5, 2, 1, 4]);
        let leaf = tree.node(tree.root()).children()[1];
        tree.arena[leaf].parent = Some(leaf);

        let err = tree.validate().unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_detects_out_of_range_record() {
        let mut tree = build(3, &[5, 2, 1, 4]);
        let first = tree.node(tree.root()).children()[0];
        tree.arena[first].data_mut()[0].key = 9;

        assert!(tree.validate().is_err());
    }

    #[test]
    fn test_detects_broken_leaf_chain() {
        let mut tree = build(3, &[5, 2, 1, 4]);
        let first = tree.node(tree.root()).children()[0];
        tree.arena[first].next = None;

        let err = tree.validate().unwrap_err();
        assert!(err.to_string().contains("links forward"));
    }

    #[test]
    fn test_detects_record_count_mismatch() {
        let mut tree = build(3, &[1, 2]);
        tree.len = 5;
        assert!(tree.validate().is_err());
    }
}
