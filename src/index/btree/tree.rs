//! The unlocked B-tree: descent, point lookup, upsert and delete.
//!
//! Structural repair lives next door: [`split`](super::split) handles
//! overflow on the way up from an insert, [`merge`](super::merge) handles
//! underflow on the way up from a delete.

use tracing::{trace, warn};

use crate::common::config::MIN_MAX_DEGREE;
use crate::common::{Error, Key, NodeId, Record, Result, Value};
use crate::index::btree::arena::NodeArena;
use crate::index::btree::node::{structural_violation, Node, NodeBody, Search};
use crate::index::stats::{IndexStats, StatsSnapshot};

/// A B+ tree over integer keys with integer payloads.
///
/// Records live only in leaves; internal nodes hold separator keys. Leaves
/// are linked left to right through `next`/`previous`.
///
/// `BTree` does no locking of its own. Share it through
/// [`BTreeIndex`](super::BTreeIndex), which wraps every call in one
/// reader/writer lock so a split or merge cascade is never observed half
/// done.
///
/// # Example
/// ```
/// use btreedb::BTree;
///
/// let mut tree = BTree::new(3);
/// for key in [5, 2, 1, 4] {
///     tree.upsert(key, key * 100).unwrap();
/// }
///
/// let root = tree.node(tree.root());
/// assert_eq!(root.keys(), &[2, 4]);
/// assert_eq!(tree.get_value(4).unwrap(), 400);
/// ```
#[derive(Debug)]
pub struct BTree {
    pub(crate) arena: NodeArena,
    pub(crate) root: NodeId,
    pub(crate) max_degree: usize,
    /// Number of records stored.
    pub(crate) len: usize,
    pub(crate) stats: IndexStats,
}

impl BTree {
    /// Create an empty tree whose root is an empty leaf.
    ///
    /// # Panics
    /// Panics if `max_degree < 2`.
    pub fn new(max_degree: usize) -> Self {
        assert!(
            max_degree >= MIN_MAX_DEGREE,
            "structural invariant violation: max_degree must be >= {}, got {}",
            MIN_MAX_DEGREE,
            max_degree
        );

        let mut arena = NodeArena::new();
        let root = arena.alloc(NodeBody::empty_leaf());

        Self {
            arena,
            root,
            max_degree,
            len: 0,
            stats: IndexStats::new(),
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a live node.
    ///
    /// # Panics
    /// Panics if `id` does not refer to a live node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }

    /// Borrow a node, or `None` if the handle is dangling.
    pub fn try_node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of levels. A lone root leaf is height 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut id = self.root;
        while let Some(&first) = self.arena[id].children().first() {
            height += 1;
            id = first;
        }
        height
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Zero the operation counters. The tree itself is untouched.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    // ========================================================================
    // Descent
    // ========================================================================

    /// Walk from the root to the leaf whose key range covers `key`.
    pub(crate) fn find_leaf(&self, key: Key) -> Result<NodeId> {
        let mut id = self.root;
        loop {
            let node = self
                .arena
                .get(id)
                .ok_or_else(|| Error::Internal(format!("descent reached dangling {}", id)))?;

            match node.search(key) {
                Search::Found(_) | Search::Missing(_) => return Ok(id),
                Search::Descend(slot) => {
                    id = *node.children().get(slot).ok_or_else(|| {
                        Error::Internal(format!("{} has no child at slot {}", id, slot))
                    })?;
                }
            }
        }
    }

    /// Land on the leaf physically holding `key` and its position there.
    ///
    /// Used by both lookup and delete. An exact separator match always
    /// routes right, which is where the record equal to a separator lives.
    pub(crate) fn locate(&self, key: Key) -> Result<(NodeId, usize)> {
        let leaf = self.find_leaf(key)?;
        match self.arena[leaf].search(key) {
            Search::Found(pos) => Ok((leaf, pos)),
            Search::Missing(_) | Search::Descend(_) => Err(Error::KeyNotFound(key)),
        }
    }

    /// Position of `child` within `parent`'s children.
    #[track_caller]
    pub(crate) fn slot_in(&self, parent: NodeId, child: NodeId) -> usize {
        match self.arena[parent].child_slot(child) {
            Some(slot) => slot,
            None => structural_violation(format_args!("{} is not a child of {}", child, parent)),
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Fetch the whole leaf holding `key` plus the key's position in it.
    ///
    /// The leaf is the unit of retrieval; index into the returned records
    /// with the position.
    ///
    /// # Errors
    /// - `Error::KeyNotFound` if no record has this key
    pub fn get(&self, key: Key) -> Result<(Vec<Record>, usize)> {
        IndexStats::bump(&self.stats.lookups);
        let (leaf, pos) = self.locate(key)?;
        Ok((self.arena[leaf].data().to_vec(), pos))
    }

    /// Fetch just the value stored under `key`.
    pub fn get_value(&self, key: Key) -> Result<Value> {
        IndexStats::bump(&self.stats.lookups);
        let (leaf, pos) = self.locate(key)?;
        Ok(self.arena[leaf].data()[pos].value)
    }

    pub fn contains_key(&self, key: Key) -> bool {
        self.locate(key).is_ok()
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert `key`, overwriting the value if the key already exists.
    pub fn upsert(&mut self, key: Key, value: Value) -> Result<()> {
        trace!(key, value, "upsert");
        self.put(key, value, true)
    }

    /// Insert `key` only if it is absent.
    ///
    /// # Errors
    /// - `Error::DuplicateKey` if the key exists; the tree is left unchanged
    pub fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        trace!(key, value, "insert");
        self.put(key, value, false)
    }

    fn put(&mut self, key: Key, value: Value, overwrite: bool) -> Result<()> {
        let leaf = self.find_leaf(key)?;

        match self.arena[leaf].search(key) {
            Search::Found(pos) => {
                if !overwrite {
                    return Err(Error::DuplicateKey(key));
                }
                self.arena[leaf].data_mut()[pos].value = value;
            }
            Search::Missing(pos) => {
                self.arena[leaf].insert_record_at(pos, Record::new(key, value));
                self.len += 1;

                if self.arena[leaf].is_overflowing(self.max_degree) {
                    self.split(leaf);
                }
            }
            Search::Descend(_) => {
                return Err(Error::Internal(format!("descent for {} stopped above the leaves", key)));
            }
        }

        IndexStats::bump(&self.stats.upserts);
        Ok(())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Remove `key` and repair any underflow up the tree.
    ///
    /// # Errors
    /// - `Error::KeyNotFound` if no record has this key
    /// - `Error::MergeImpossible` if the leaf underflows, still holds
    ///   records, and has no sibling under its parent; the record is put
    ///   back first
    pub fn delete(&mut self, key: Key) -> Result<()> {
        trace!(key, "delete");
        let (leaf, pos) = self.locate(key)?;
        let removed = self.arena[leaf].remove_record_at(pos);

        if leaf != self.root {
            if self.arena[leaf].is_underflowing(self.max_degree) {
                if let Err(err) = self.rebalance(leaf, key) {
                    self.arena[leaf].insert_record_at(pos, removed);
                    warn!(key, %err, "delete rolled back");
                    return Err(err);
                }
            } else {
                self.refresh_separator(leaf);
            }
        }

        self.len -= 1;
        IndexStats::bump(&self.stats.deletes);
        Ok(())
    }

    /// Tighten a leaf's separator after it lost its smallest record.
    ///
    /// Only the separator directly left of the leaf in its own parent is
    /// touched. A stale separator higher up still routes correctly.
    fn refresh_separator(&mut self, leaf: NodeId) {
        let Some(parent) = self.arena[leaf].parent else {
            return;
        };
        let Some(min) = self.arena[leaf].data().first().map(|r| r.key) else {
            return;
        };

        let slot = self.slot_in(parent, leaf);
        if slot == 0 {
            return;
        }

        let (keys, _) = self.arena[parent].internals_mut();
        if keys[slot - 1] < min {
            trace!(old = keys[slot - 1], new = min, "refresh separator");
            keys[slot - 1] = min;
        }
    }
}
