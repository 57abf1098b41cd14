//! Overflow repair.
//!
//! An insert that overfills a leaf splits it and pushes a separator into the
//! parent. If that overfills the parent the split repeats one level up, and
//! so on until a node has room or the root itself splits and the tree grows a
//! level.
//!
//! ```text
//! max_degree = 3, insert 4 into [2 5]:
//!
//!        [2]                      [2 4]
//!       /   \          =>        /  |  \
//!    [1]   [2 4 5]            [1]  [2]  [4 5]
//! ```

use tracing::debug;

use crate::common::{Key, NodeId};
use crate::index::btree::node::{structural_violation, NodeBody};
use crate::index::btree::BTree;
use crate::index::stats::IndexStats;

impl BTree {
    /// Split `start` and every ancestor the split overfills.
    pub(crate) fn split(&mut self, start: NodeId) {
        let mut id = start;

        while self.arena[id].is_overflowing(self.max_degree) {
            let parent = match self.arena[id].parent {
                Some(parent) => parent,
                None => self.grow_root(id),
            };

            let (separator, sibling) = if self.arena[id].is_leaf() {
                self.split_leaf(id)
            } else {
                self.split_internal(id)
            };

            let slot = self.slot_in(parent, id);
            self.arena[parent].insert_child_at(slot, separator, sibling);

            IndexStats::bump(&self.stats.splits);
            debug!(node = %id, %sibling, separator, "split");

            id = parent;
        }
    }

    /// Demote the root under a fresh, empty internal root.
    ///
    /// The old root keeps its body; the caller then splits it like any other
    /// node, which leaves the new root with one separator and two children.
    fn grow_root(&mut self, old_root: NodeId) -> NodeId {
        let new_root = self.arena.alloc(NodeBody::Internal {
            keys: Vec::new(),
            children: vec![old_root],
        });
        self.arena[old_root].parent = Some(new_root);
        self.root = new_root;

        IndexStats::bump(&self.stats.root_splits);
        debug!(old = %old_root, new = %new_root, "root split, tree grows");

        new_root
    }

    /// Move the upper half of a leaf's records into a new right sibling.
    ///
    /// Returns the promoted separator (the sibling's first key) and the
    /// sibling. The sibling is spliced into the leaf chain but not yet into
    /// the parent.
    fn split_leaf(&mut self, id: NodeId) -> (Key, NodeId) {
        let parent = self.arena[id].parent;
        let old_next = self.arena[id].next;

        let upper = {
            let data = self.arena[id].data_mut();
            let mid = data.len() / 2;
            data.split_off(mid)
        };
        let separator = match upper.first() {
            Some(record) => record.key,
            None => structural_violation(format_args!("splitting {} with no records", id)),
        };

        let sibling = self.arena.alloc(NodeBody::Leaf { data: upper });
        {
            let node = &mut self.arena[sibling];
            node.parent = parent;
            node.previous = Some(id);
            node.next = old_next;
        }
        self.arena[id].next = Some(sibling);
        if let Some(next) = old_next {
            self.arena[next].previous = Some(sibling);
        }

        (separator, sibling)
    }

    /// Promote the middle key of an internal node.
    ///
    /// With `mid = keys.len() / 2`, keys `[0, mid)` and children `[0, mid]`
    /// stay, `keys[mid]` is returned, the rest moves to a new right sibling
    /// and is re-parented there.
    fn split_internal(&mut self, id: NodeId) -> (Key, NodeId) {
        let parent = self.arena[id].parent;

        let (separator, keys, children) = {
            let (keys, children) = self.arena[id].internals_mut();
            let mid = keys.len() / 2;
            let upper_keys = keys.split_off(mid + 1);
            let upper_children = children.split_off(mid + 1);
            (keys.pop(), upper_keys, upper_children)
        };
        let separator = match separator {
            Some(key) => key,
            None => structural_violation(format_args!("splitting {} with no keys", id)),
        };

        let moved = children.clone();
        let sibling = self.arena.alloc(NodeBody::Internal { keys, children });
        self.arena[sibling].parent = parent;
        for child in moved {
            self.arena[child].parent = Some(sibling);
        }

        (separator, sibling)
    }
}

#[cfg(test)]
mod tests {
    use crate::common::Key;
    use crate::index::btree::node::NodeKind;
    use crate::index::btree::BTree;

    fn build(max_degree: usize, keys: &[Key]) -> BTree {
        let mut tree = BTree::new(max_degree);
        for &k in keys {
            tree.upsert(k, k).unwrap();
        }
        tree
    }

    #[test]
    fn test_root_leaf_split_demotes_root() {
        let tree = build(3, &[5, 2, 1]);
        let root = tree.node(tree.root());

        assert_eq!(root.kind(), NodeKind::Root);
        assert_eq!(root.keys(), &[2]);

        let left = tree.node(root.children()[0]);
        let right = tree.node(root.children()[1]);
        assert_eq!(left.kind(), NodeKind::Leaf);
        assert_eq!(left.data_keys(), vec![1]);
        assert_eq!(right.data_keys(), vec![2, 5]);
        assert_eq!(tree.stats().root_splits, 1);
    }

    #[test]
    fn test_leaf_split_links_chain() {
        let tree = build(3, &[5, 2, 1, 4]);
        let root = tree.node(tree.root());
        let [a, b, c] = [root.children()[0], root.children()[1], root.children()[2]];

        assert_eq!(tree.node(a).next(), Some(b));
        assert_eq!(tree.node(b).next(), Some(c));
        assert_eq!(tree.node(c).next(), None);
        assert_eq!(tree.node(c).previous(), Some(b));
        assert_eq!(tree.node(b).previous(), Some(a));
        assert_eq!(tree.node(a).previous(), None);
    }

    #[test]
    fn test_split_of_first_leaf_inserts_sibling_in_place() {
        // Leaves {1 2} {3 4} {5 6} under [3 5]
        let mut tree = build(4, &[1, 2, 3, 4, 5, 6]);
        tree.upsert(0, 0).unwrap();
        tree.upsert(-1, -1).unwrap();
        tree.validate().unwrap();

        let root = tree.node(tree.root());
        assert_eq!(root.keys(), &[1, 3, 5]);

        let leaves: Vec<Vec<Key>> = root
            .children()
            .iter()
            .map(|&c| tree.node(c).data_keys())
            .collect();
        assert_eq!(leaves, vec![vec![-1, 0], vec![1, 2], vec![3, 4], vec![5, 6]]);

        let first = tree.node(root.children()[0]);
        assert_eq!(first.next(), Some(root.children()[1]));
        assert_eq!(tree.node(root.children()[2]).previous(), Some(root.children()[1]));
    }

    #[test]
    fn test_internal_split_reparents_children() {
        let tree = build(3, &[5, 2, 1, 4, 6]);
        let root = tree.node(tree.root());
        assert_eq!(root.keys(), &[4]);

        for &half in root.children() {
            let node = tree.node(half);
            assert_eq!(node.kind(), NodeKind::Internal);
            assert_eq!(node.parent(), Some(tree.root()));
            for &child in node.children() {
                assert_eq!(tree.node(child).parent(), Some(half));
            }
        }
    }

    #[test]
    fn test_ascending_inserts_stay_balanced() {
        let keys: Vec<Key> = (0..500).collect();
        let tree = build(4, &keys);

        tree.validate().unwrap();
        assert_eq!(tree.len(), 500);
        assert!(tree.height() <= 9);
        assert_eq!(tree.stats().root_splits as usize, tree.height() - 1);
    }

    #[test]
    fn test_degree_two_splits_every_leaf() {
        let tree = build(2, &[1, 2, 3, 4, 5]);
        tree.validate().unwrap();
        for key in 1..=5 {
            assert_eq!(tree.get_value(key).unwrap(), key);
        }
    }
}
