//! Node arena - owns every node of one tree.
//!
//! Nodes live in a slot vector and refer to each other through [`NodeId`]
//! handles. Freed slots go on a free list and are handed out again by the
//! next allocation.

use std::ops::{Index, IndexMut};

use crate::common::{NodeId, PageId};
use crate::index::btree::node::{structural_violation, Node, NodeBody};

/// Slot storage for the nodes of a [`BTree`](super::BTree).
///
/// # Layout
/// ```text
/// ┌──────────────────────────────────────────────────────┐
/// │ slots: Vec<Option<Node>>                             │
/// │  [Some(root)] [Some(leaf)] [None] [Some(leaf)] ...   │
/// ├──────────────────────────────────────────────────────┤
/// │ free_list: Vec<NodeId>   (LIFO)        → [2]         │
/// └──────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Option<Node>>,

    /// Stack of vacant slots (LIFO for cache locality).
    free_list: Vec<NodeId>,

    /// Number of occupied slots.
    live: usize,

    /// Next page id to stamp on a new node.
    next_page_id: PageId,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node and return its handle.
    ///
    /// The node is stamped with a fresh [`PageId`]; once the id space runs
    /// out every later node gets [`PageId::INVALID`].
    pub fn alloc(&mut self, body: NodeBody) -> NodeId {
        let page_id = self.next_page_id;
        self.next_page_id = page_id.next();

        let node = Node::new(body, page_id);
        self.live += 1;

        match self.free_list.pop() {
            Some(id) => {
                self.slots[id.0] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                NodeId::new(self.slots.len() - 1)
            }
        }
    }

    /// Remove a node, returning it. The handle becomes dangling.
    #[track_caller]
    pub fn free(&mut self, id: NodeId) -> Node {
        match self.slots.get_mut(id.0).and_then(Option::take) {
            Some(node) => {
                self.live -= 1;
                self.free_list.push(id);
                node
            }
            None => structural_violation(format_args!("double free of {}", id)),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live nodes with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (NodeId::new(i), node)))
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    #[track_caller]
    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => structural_violation(format_args!("dangling handle {}", id)),
        }
    }
}

impl IndexMut<NodeId> for NodeArena {
    #[track_caller]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.get_mut(id) {
            Some(node) => node,
            None => structural_violation(format_args!("dangling handle {}", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_assigns_sequential_ids() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(NodeBody::empty_leaf());
        let b = arena.alloc(NodeBody::empty_leaf());

        assert_eq!(a, NodeId::new(0));
        assert_eq!(b, NodeId::new(1));
        assert_eq!(arena[a].page_id(), PageId::new(0));
        assert_eq!(arena[b].page_id(), PageId::new(1));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_free_slot_is_reused() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(NodeBody::empty_leaf());
        let _b = arena.alloc(NodeBody::empty_leaf());

        arena.free(a);
        assert!(!arena.contains(a));
        assert_eq!(arena.len(), 1);

        // Same slot, fresh page id
        let c = arena.alloc(NodeBody::empty_leaf());
        assert_eq!(c, a);
        assert_eq!(arena[c].page_id(), PageId::new(2));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_iter_skips_vacant_slots() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(NodeBody::empty_leaf());
        let b = arena.alloc(NodeBody::empty_leaf());
        let c = arena.alloc(NodeBody::empty_leaf());
        arena.free(b);

        let ids: Vec<NodeId> = arena.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn test_double_free_panics() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(NodeBody::empty_leaf());
        arena.free(a);
        arena.free(a);
    }

    #[test]
    #[should_panic(expected = "dangling handle")]
    fn test_dangling_index_panics() {
        let arena = NodeArena::new();
        let _ = &arena[NodeId::new(3)];
    }
}
