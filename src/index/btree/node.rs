//! B-tree node layout and the node-local search/mutation primitives.

use std::fmt;

use crate::common::{Key, NodeId, PageId, Record};

/// Abort on a broken tree.
///
/// Reached only when a handle or node shape contradicts the tree's own
/// bookkeeping. Continuing would compound the corruption, so this panics.
#[cold]
#[track_caller]
pub(crate) fn structural_violation(what: fmt::Arguments<'_>) -> ! {
    panic!("structural invariant violation: {}", what)
}

/// Role of a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The entry point. May carry either body shape.
    Root,
    /// Separator keys plus owned children.
    Internal,
    /// Sorted records.
    Leaf,
}

/// Shape-dependent contents of a node.
///
/// A leaf never has children and an internal node never holds records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody {
    Leaf {
        data: Vec<Record>,
    },
    Internal {
        /// `keys[i]` separates `children[i]` from `children[i + 1]`.
        keys: Vec<Key>,
        children: Vec<NodeId>,
    },
}

impl NodeBody {
    /// A leaf body with no records.
    pub fn empty_leaf() -> Self {
        NodeBody::Leaf { data: Vec::new() }
    }
}

/// Where [`Node::search`] ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    /// Leaf holds the key at this position.
    Found(usize),
    /// Leaf lacks the key; this is its sorted insertion point.
    Missing(usize),
    /// Internal node: continue in `children[slot]`.
    Descend(usize),
}

/// One page worth of the tree.
///
/// Links to other nodes are [`NodeId`] handles into the arena. `parent`,
/// `next` and `previous` are non-owning; only an internal node's
/// `children` list confers ownership.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) body: NodeBody,
    pub(crate) parent: Option<NodeId>,
    /// Leaf chain, leaves only.
    pub(crate) next: Option<NodeId>,
    pub(crate) previous: Option<NodeId>,
    pub(crate) page_id: PageId,
}

impl Node {
    pub(crate) fn new(body: NodeBody, page_id: PageId) -> Self {
        Self {
            body,
            parent: None,
            next: None,
            previous: None,
            page_id,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The node's role. A node is the root exactly when it has no parent.
    pub fn kind(&self) -> NodeKind {
        match (&self.parent, &self.body) {
            (None, _) => NodeKind::Root,
            (Some(_), NodeBody::Leaf { .. }) => NodeKind::Leaf,
            (Some(_), NodeBody::Internal { .. }) => NodeKind::Internal,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether the node carries records (a leaf, or a root acting as one).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.body, NodeBody::Leaf { .. })
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    /// Separator keys. Empty for leaves.
    pub fn keys(&self) -> &[Key] {
        match &self.body {
            NodeBody::Internal { keys, .. } => keys,
            NodeBody::Leaf { .. } => &[],
        }
    }

    /// Child handles. Empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match &self.body {
            NodeBody::Internal { children, .. } => children,
            NodeBody::Leaf { .. } => &[],
        }
    }

    /// Sorted records. Empty for internal nodes.
    pub fn data(&self) -> &[Record] {
        match &self.body {
            NodeBody::Leaf { data } => data,
            NodeBody::Internal { .. } => &[],
        }
    }

    /// Keys of the records held by a leaf.
    pub fn data_keys(&self) -> Vec<Key> {
        self.data().iter().map(|r| r.key).collect()
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    #[inline]
    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    // ========================================================================
    // Occupancy
    // ========================================================================

    /// Records held by a leaf, separator keys held by an internal node.
    pub fn occupancy(&self) -> usize {
        match &self.body {
            NodeBody::Leaf { data } => data.len(),
            NodeBody::Internal { keys, .. } => keys.len(),
        }
    }

    /// A leaf splits once it holds `max_degree` records; an internal node
    /// once it holds more than `max_degree - 1` keys.
    pub fn is_overflowing(&self, max_degree: usize) -> bool {
        match &self.body {
            NodeBody::Leaf { data } => data.len() >= max_degree,
            NodeBody::Internal { keys, .. } => keys.len() > max_degree - 1,
        }
    }

    /// Lowest occupancy a non-root node may have.
    pub fn min_occupancy(&self, max_degree: usize) -> usize {
        match &self.body {
            NodeBody::Leaf { .. } => max_degree / 2,
            NodeBody::Internal { .. } => (max_degree - 1) / 2,
        }
    }

    /// The root never underflows.
    pub fn is_underflowing(&self, max_degree: usize) -> bool {
        !self.is_root() && self.occupancy() < self.min_occupancy(max_degree)
    }

    /// Whether the node can give one entry away and stay at or above its
    /// minimum.
    pub fn can_lend(&self, max_degree: usize) -> bool {
        self.occupancy() > self.min_occupancy(max_degree)
    }

    // ========================================================================
    // OrderedSearch
    // ========================================================================

    /// Binary search for `key` within this node.
    ///
    /// Leaves answer [`Search::Found`] or [`Search::Missing`]. Internal nodes
    /// answer [`Search::Descend`]: an exact separator match goes to the right
    /// child, since a separator is the smallest key of its right subtree;
    /// otherwise the insertion point picks the child. The slot is clamped to
    /// the last child so a short `children` list is never indexed past its
    /// end.
    pub fn search(&self, key: Key) -> Search {
        match &self.body {
            NodeBody::Leaf { data } => match data.binary_search_by_key(&key, |r| r.key) {
                Ok(pos) => Search::Found(pos),
                Err(pos) => Search::Missing(pos),
            },
            NodeBody::Internal { keys, children } => {
                let last = children.len().saturating_sub(1);
                let slot = match keys.binary_search(&key) {
                    Ok(idx) => idx + 1,
                    Err(idx) => idx,
                };
                Search::Descend(slot.min(last))
            }
        }
    }

    /// Position of `child` in this node's children.
    pub fn child_slot(&self, child: NodeId) -> Option<usize> {
        self.children().iter().position(|&c| c == child)
    }

    // ========================================================================
    // Mutation primitives
    // ========================================================================

    #[track_caller]
    pub(crate) fn data_mut(&mut self) -> &mut Vec<Record> {
        match &mut self.body {
            NodeBody::Leaf { data } => data,
            NodeBody::Internal { .. } => {
                structural_violation(format_args!("{} used as a leaf", self.page_id))
            }
        }
    }

    #[track_caller]
    pub(crate) fn internals_mut(&mut self) -> (&mut Vec<Key>, &mut Vec<NodeId>) {
        match &mut self.body {
            NodeBody::Internal { keys, children } => (keys, children),
            NodeBody::Leaf { .. } => {
                structural_violation(format_args!("{} used as an internal node", self.page_id))
            }
        }
    }

    /// Sorted insert of a record at its search position.
    pub(crate) fn insert_record_at(&mut self, pos: usize, record: Record) {
        self.data_mut().insert(pos, record);
    }

    pub(crate) fn remove_record_at(&mut self, pos: usize) -> Record {
        self.data_mut().remove(pos)
    }

    /// Insert `separator` at `slot` and `child` just right of it.
    pub(crate) fn insert_child_at(&mut self, slot: usize, separator: Key, child: NodeId) {
        let (keys, children) = self.internals_mut();
        keys.insert(slot, separator);
        children.insert(slot + 1, child);
    }

    /// Drop `children[slot]` together with the separator at `key_slot`.
    pub(crate) fn remove_child_at(&mut self, slot: usize, key_slot: usize) -> Key {
        let (keys, children) = self.internals_mut();
        children.remove(slot);
        keys.remove(key_slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(keys: &[Key]) -> Node {
        let data = keys.iter().map(|&k| Record::new(k, k * 10)).collect();
        let mut node = Node::new(NodeBody::Leaf { data }, PageId::new(0));
        node.parent = Some(NodeId::new(99));
        node
    }

    fn internal(keys: &[Key]) -> Node {
        let children = (0..=keys.len()).map(NodeId::new).collect();
        let mut node = Node::new(
            NodeBody::Internal {
                keys: keys.to_vec(),
                children,
            },
            PageId::new(1),
        );
        node.parent = Some(NodeId::new(99));
        node
    }

    #[test]
    fn test_empty_leaf_body() {
        let node = Node::new(NodeBody::empty_leaf(), PageId::new(3));
        assert!(node.is_leaf());
        assert!(node.data().is_empty());
        assert_eq!(node.occupancy(), 0);
        assert_eq!(node.kind(), NodeKind::Root);
    }

    #[test]
    fn test_kind_follows_parent_and_body() {
        let mut node = leaf(&[1]);
        assert_eq!(node.kind(), NodeKind::Leaf);
        node.parent = None;
        assert_eq!(node.kind(), NodeKind::Root);
        assert!(node.is_leaf());

        assert_eq!(internal(&[5]).kind(), NodeKind::Internal);
    }

    #[test]
    fn test_leaf_search() {
        let node = leaf(&[2, 4, 6]);
        assert_eq!(node.search(4), Search::Found(1));
        assert_eq!(node.search(1), Search::Missing(0));
        assert_eq!(node.search(5), Search::Missing(2));
        assert_eq!(node.search(7), Search::Missing(3));
    }

    #[test]
    fn test_internal_search_exact_match_goes_right() {
        let node = internal(&[10, 20]);
        assert_eq!(node.search(10), Search::Descend(1));
        assert_eq!(node.search(20), Search::Descend(2));
    }

    #[test]
    fn test_internal_search_insertion_point() {
        let node = internal(&[10, 20]);
        assert_eq!(node.search(5), Search::Descend(0));
        assert_eq!(node.search(15), Search::Descend(1));
        assert_eq!(node.search(25), Search::Descend(2));
    }

    #[test]
    fn test_internal_search_clamps_to_last_child() {
        let mut node = internal(&[10, 20]);
        node.internals_mut().1.pop();
        assert_eq!(node.search(25), Search::Descend(1));
        assert_eq!(node.search(20), Search::Descend(1));
    }

    #[test]
    fn test_overflow_thresholds() {
        assert!(!leaf(&[1, 2]).is_overflowing(3));
        assert!(leaf(&[1, 2, 3]).is_overflowing(3));
        assert!(!internal(&[1, 2]).is_overflowing(3));
        assert!(internal(&[1, 2, 3]).is_overflowing(3));
    }

    #[test]
    fn test_underflow_thresholds() {
        assert!(leaf(&[]).is_underflowing(3));
        assert!(!leaf(&[1]).is_underflowing(3));
        assert!(leaf(&[1]).is_underflowing(4));
        assert!(internal(&[]).is_underflowing(3));
        assert!(!internal(&[1]).is_underflowing(3));

        let mut root = leaf(&[]);
        root.parent = None;
        assert!(!root.is_underflowing(3));
    }

    #[test]
    fn test_can_lend() {
        assert!(leaf(&[1, 2, 3]).can_lend(4));
        assert!(!leaf(&[1, 2]).can_lend(4));
        assert!(internal(&[1, 2]).can_lend(4));
        assert!(!internal(&[1]).can_lend(4));
    }

    #[test]
    fn test_record_primitives() {
        let mut node = leaf(&[1, 3]);
        node.insert_record_at(1, Record::new(2, 20));
        assert_eq!(node.data_keys(), vec![1, 2, 3]);
        assert_eq!(node.remove_record_at(0), Record::new(1, 10));
        assert_eq!(node.data_keys(), vec![2, 3]);
    }

    #[test]
    fn test_child_primitives() {
        let mut node = internal(&[10]);
        node.insert_child_at(1, 20, NodeId::new(7));
        assert_eq!(node.keys(), &[10, 20]);
        assert_eq!(node.children(), &[NodeId::new(0), NodeId::new(1), NodeId::new(7)]);
        assert_eq!(node.child_slot(NodeId::new(7)), Some(2));

        assert_eq!(node.remove_child_at(1, 0), 10);
        assert_eq!(node.keys(), &[20]);
        assert_eq!(node.children(), &[NodeId::new(0), NodeId::new(7)]);
    }

    #[test]
    #[should_panic(expected = "structural invariant violation")]
    fn test_leaf_used_as_internal_panics() {
        leaf(&[1]).insert_child_at(0, 1, NodeId::new(3));
    }
}
