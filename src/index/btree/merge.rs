//! Underflow repair.
//!
//! A delete that drains a non-root node below its minimum first tries to
//! fold the node into an adjacent sibling under the same parent, left
//! neighbour first. Folding removes one separator from the parent, which may
//! drain the parent in turn, so the repair walks upward like a split does.
//! When neither neighbour has room, one entry is borrowed from a neighbour
//! that can spare it, and the walk stops there.
//!
//! ```text
//! max_degree = 3, delete 5:
//!
//!              [4 6]                                [6]
//!         /      |      \                       /         \
//!      [2]      [5]      [7]        =>      [2 4]          [7]
//!     /   \    /   \    /   \             /  |  \        /   \
//!   {1} {2 3} {4}  {5} {6} {7 8}         {1} {2 3} {4}   {6} {7 8}
//! ```
//!
//! `{5}` empties and folds into `{4}`, which leaves `[5]` with no keys; that
//! node folds into `[2]` and takes the parent separator `4` with it.
//!
//! When the cascade empties the root, its only child becomes the new root
//! and the tree loses a level.
//!
//! With `max_degree = 2` an internal node may hold no keys and a single
//! child. An emptied leaf under such a node has no neighbour to fold into,
//! so it is cut out along with its single-child ancestors instead.

use tracing::debug;

use crate::common::{Error, Key, NodeId, Result};
use crate::index::btree::node::{structural_violation, Node, NodeBody};
use crate::index::btree::BTree;
use crate::index::stats::IndexStats;

/// Which neighbour of the underflowing node is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Repair chosen by [`BTree::pre_merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rebalance {
    /// Fold the underflowing node into `sibling` and drop it.
    Merge { sibling: NodeId, side: Side },
    /// Move one entry from `sibling` into the underflowing node.
    Borrow { sibling: NodeId, side: Side },
}

impl BTree {
    /// Repair underflow at `start` and every ancestor the repair drains.
    ///
    /// An emptied leaf that is the only child of its parent is pruned
    /// together with its single-child ancestors. Otherwise this fails without
    /// touching the tree if `start` has no neighbour under its parent. Every
    /// later step always has one: a non-root parent that can underflow keeps
    /// at least one separator, and so at least two children.
    pub(crate) fn rebalance(&mut self, start: NodeId, key: Key) -> Result<()> {
        let mut id = start;

        loop {
            let parent = match self.pre_merge(id) {
                Some(Rebalance::Borrow { sibling, side }) => {
                    self.borrow_from_sibling(id, sibling, side);
                    return Ok(());
                }
                Some(Rebalance::Merge { sibling, side }) => self.merge_sibling(id, sibling, side),
                None if self.is_prunable(id) => self.prune(id),
                None if id == start => return Err(Error::MergeImpossible { key, node: id }),
                None => structural_violation(format_args!("{} underflows with no sibling", id)),
            };

            if parent == self.root {
                self.collapse_root();
                return Ok(());
            }
            if !self.arena[parent].is_underflowing(self.max_degree) {
                return Ok(());
            }
            id = parent;
        }
    }

    /// Pick a repair for an underflowing node.
    ///
    /// Merging is preferred over borrowing and the left neighbour over the
    /// right. Returns `None` if the node has no neighbour under its parent.
    pub(crate) fn pre_merge(&self, id: NodeId) -> Option<Rebalance> {
        let (left, right) = self.neighbours(id);
        let candidates = [(left, Side::Left), (right, Side::Right)];

        for (sibling, side) in candidates {
            if let Some(sibling) = sibling {
                if self.fits_merge(id, sibling) {
                    return Some(Rebalance::Merge { sibling, side });
                }
            }
        }

        for (sibling, side) in candidates {
            if let Some(sibling) = sibling {
                if self.arena[sibling].can_lend(self.max_degree) {
                    return Some(Rebalance::Borrow { sibling, side });
                }
            }
        }

        None
    }

    /// Adjacent nodes sharing `id`'s parent.
    ///
    /// Leaves look along the leaf chain and reject a neighbour that hangs
    /// off a different parent. Internal nodes look at the adjacent slots of
    /// their parent.
    fn neighbours(&self, id: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        let node = &self.arena[id];
        let Some(parent) = node.parent else {
            return (None, None);
        };

        if node.is_leaf() {
            let same_parent = |n: Option<NodeId>| n.filter(|&s| self.arena[s].parent == Some(parent));
            return (same_parent(node.previous), same_parent(node.next));
        }

        let siblings = self.arena[parent].children();
        let slot = self.slot_in(parent, id);
        let left = slot.checked_sub(1).map(|s| siblings[s]);
        let right = siblings.get(slot + 1).copied();
        (left, right)
    }

    /// Whether `id` and `sibling` fit in one node without overflowing.
    ///
    /// An internal merge also pulls the parent separator down, so it needs
    /// one extra key of room.
    fn fits_merge(&self, id: NodeId, sibling: NodeId) -> bool {
        let node = &self.arena[id];
        let combined = node.occupancy() + self.arena[sibling].occupancy();
        if node.is_leaf() {
            combined < self.max_degree
        } else {
            combined + 1 < self.max_degree
        }
    }

    /// Fold `id` into `sibling` and free `id`. Returns the shared parent.
    ///
    /// # Panics
    /// Panics if the two nodes do not share a parent.
    pub(crate) fn merge_sibling(&mut self, id: NodeId, sibling: NodeId, side: Side) -> NodeId {
        let parent = match (self.arena[id].parent, self.arena[sibling].parent) {
            (Some(p), Some(q)) if p == q => p,
            _ => structural_violation(format_args!(
                "merging {} into {} across different parents",
                id, sibling
            )),
        };

        let slot = self.slot_in(parent, id);
        let key_slot = match side {
            Side::Left => slot - 1,
            Side::Right => slot,
        };
        let separator = self.arena[parent].remove_child_at(slot, key_slot);

        let Node {
            body,
            previous,
            next,
            ..
        } = self.arena.free(id);

        match body {
            NodeBody::Leaf { data } => {
                let survivor = self.arena[sibling].data_mut();
                match side {
                    Side::Left => survivor.extend(data),
                    Side::Right => {
                        let mut merged = data;
                        merged.append(survivor);
                        *survivor = merged;
                    }
                }
                self.unlink_leaf(previous, next);
            }
            NodeBody::Internal { keys, children } => {
                for &child in &children {
                    self.arena[child].parent = Some(sibling);
                }

                let (s_keys, s_children) = self.arena[sibling].internals_mut();
                match side {
                    Side::Left => {
                        s_keys.push(separator);
                        s_keys.extend(keys);
                        s_children.extend(children);
                    }
                    Side::Right => {
                        let mut merged_keys = keys;
                        merged_keys.push(separator);
                        merged_keys.append(s_keys);
                        *s_keys = merged_keys;

                        let mut merged_children = children;
                        merged_children.append(s_children);
                        *s_children = merged_children;
                    }
                }
            }
        }

        IndexStats::bump(&self.stats.merges);
        debug!(node = %id, into = %sibling, separator, "merge");

        parent
    }

    /// An empty leaf that is its parent's only child.
    ///
    /// Only `max_degree = 2` builds these: an internal split there leaves the
    /// right half with no keys and one child.
    fn is_prunable(&self, id: NodeId) -> bool {
        let node = &self.arena[id];
        node.is_leaf()
            && node.data().is_empty()
            && node
                .parent
                .is_some_and(|parent| self.arena[parent].children().len() == 1)
    }

    /// Free an empty leaf and every ancestor left without children, then
    /// drop the freed subtree from the first ancestor with other children.
    /// Returns that ancestor.
    ///
    /// The ancestor loses one separator. Removing the first child takes
    /// `keys[0]` and widens the next child's range downwards; any other
    /// child takes the separator on its left.
    fn prune(&mut self, leaf: NodeId) -> NodeId {
        let mut doomed = vec![leaf];
        let mut top = leaf;
        let anchor = loop {
            let parent = match self.arena[top].parent {
                Some(parent) => parent,
                None => structural_violation(format_args!("pruning up to the root from {}", leaf)),
            };
            if parent == self.root || self.arena[parent].children().len() > 1 {
                break parent;
            }
            doomed.push(parent);
            top = parent;
        };

        if self.arena[anchor].children().len() < 2 {
            structural_violation(format_args!("{} would lose its only child", anchor));
        }
        let slot = self.slot_in(anchor, top);
        self.arena[anchor].remove_child_at(slot, slot.saturating_sub(1));

        let (previous, next) = (self.arena[leaf].previous, self.arena[leaf].next);
        self.unlink_leaf(previous, next);
        for id in doomed {
            self.arena.free(id);
        }

        debug!(node = %leaf, from = %anchor, "prune");

        anchor
    }

    fn unlink_leaf(&mut self, previous: Option<NodeId>, next: Option<NodeId>) {
        if let Some(p) = previous {
            self.arena[p].next = next;
        }
        if let Some(n) = next {
            self.arena[n].previous = previous;
        }
    }

    /// Move one entry from `sibling` into `id` and fix the separator
    /// between them.
    ///
    /// Leaves move a record and set the separator to the right node's new
    /// first key. Internal nodes rotate through the parent: the separator
    /// comes down into `id`, the sibling's edge key goes up, and the edge
    /// child changes parent.
    pub(crate) fn borrow_from_sibling(&mut self, id: NodeId, sibling: NodeId, side: Side) {
        let parent = match self.arena[id].parent {
            Some(parent) => parent,
            None => structural_violation(format_args!("borrowing into parentless {}", id)),
        };
        let slot = self.slot_in(parent, id);
        let key_slot = match side {
            Side::Left => slot - 1,
            Side::Right => slot,
        };

        let separator = if self.arena[id].is_leaf() {
            self.borrow_record(id, sibling, side)
        } else {
            self.borrow_child(id, sibling, side, parent, key_slot)
        };
        self.arena[parent].internals_mut().0[key_slot] = separator;

        IndexStats::bump(&self.stats.borrows);
        debug!(node = %id, from = %sibling, separator, "borrow");
    }

    /// Returns the new separator between the two leaves.
    fn borrow_record(&mut self, id: NodeId, sibling: NodeId, side: Side) -> Key {
        match side {
            Side::Left => {
                let Some(record) = self.arena[sibling].data_mut().pop() else {
                    structural_violation(format_args!("borrowing from empty {}", sibling));
                };
                self.arena[id].insert_record_at(0, record);
                record.key
            }
            Side::Right => {
                let lender = self.arena[sibling].data_mut();
                if lender.len() < 2 {
                    structural_violation(format_args!("{} cannot lend its last record", sibling));
                }
                let record = lender.remove(0);
                let new_min = lender[0].key;
                self.arena[id].data_mut().push(record);
                new_min
            }
        }
    }

    /// Returns the key that replaces the parent separator.
    fn borrow_child(
        &mut self,
        id: NodeId,
        sibling: NodeId,
        side: Side,
        parent: NodeId,
        key_slot: usize,
    ) -> Key {
        let down = self.arena[parent].keys()[key_slot];

        let (up, child) = {
            let (s_keys, s_children) = self.arena[sibling].internals_mut();
            if s_keys.is_empty() || s_children.len() < 2 {
                structural_violation(format_args!("{} has nothing to lend", sibling));
            }
            match side {
                Side::Left => match (s_keys.pop(), s_children.pop()) {
                    (Some(k), Some(c)) => (k, c),
                    _ => structural_violation(format_args!("{} has nothing to lend", sibling)),
                },
                Side::Right => (s_keys.remove(0), s_children.remove(0)),
            }
        };

        let (keys, children) = self.arena[id].internals_mut();
        match side {
            Side::Left => {
                keys.insert(0, down);
                children.insert(0, child);
            }
            Side::Right => {
                keys.push(down);
                children.push(child);
            }
        }
        self.arena[child].parent = Some(id);

        up
    }

    /// Replace a keyless internal root by its only child, repeatedly.
    ///
    /// Each step makes the tree one level shorter. With `max_degree = 2` the
    /// promoted child may itself be keyless, hence the loop. A root leaf is
    /// left alone, even when empty.
    pub(crate) fn collapse_root(&mut self) {
        loop {
            let root = &self.arena[self.root];
            if root.is_leaf() || !root.keys().is_empty() {
                return;
            }

            let child = match root.children() {
                [only] => *only,
                other => structural_violation(format_args!(
                    "keyless root {} has {} children",
                    self.root,
                    other.len()
                )),
            };

            let old_root = self.root;
            self.arena.free(old_root);
            self.arena[child].parent = None;
            self.root = child;

            IndexStats::bump(&self.stats.root_collapses);
            debug!(old = %old_root, new = %child, "root collapse, tree shrinks");
        }
    }
}
