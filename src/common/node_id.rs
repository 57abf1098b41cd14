//! Node handle type.

use std::fmt;

/// Identifies a node slot in the index's node arena.
///
/// Using `usize` because:
/// 1. Nodes are stored in `Vec<Option<Node>>`
/// 2. Direct indexing without casting: `slots[node_id.0]`
/// 3. Parent, child and sibling links are plain copies of this handle,
///    so no link ever owns the node it points at
///
/// A handle stays valid until its node is merged away; the slot may then be
/// reused for a node created by a later split.
///
/// # Example
/// ```
/// use btreedb::NodeId;
///
/// let node_id = NodeId::new(5);
/// assert_eq!(node_id.0, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Create a new NodeId.
    #[inline]
    pub fn new(id: usize) -> Self {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_new() {
        let nid = NodeId::new(10);
        assert_eq!(nid.0, 10);
    }

    #[test]
    fn test_node_id_equality() {
        assert_eq!(NodeId::new(5), NodeId::new(5));
        assert_ne!(NodeId::new(5), NodeId::new(6));
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(format!("{}", NodeId::new(42)), "Node(42)");
    }
}
