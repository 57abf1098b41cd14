//! Thread-safe front for a [`BTree`].

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::info;

use crate::common::{IndexConfig, Key, Record, Result, Value};
use crate::index::btree::BTree;
use crate::index::stats::StatsSnapshot;

/// A [`BTree`] behind one reader/writer lock.
///
/// # Thread Safety
/// - `upsert`, `insert`, `delete`: exclusive lock for the whole operation,
///   including any split or merge cascade
/// - everything else: shared lock, so lookups run in parallel
/// - statistics are atomic and only need the shared lock
///
/// # Example
/// ```
/// use btreedb::BTreeIndex;
///
/// let index = BTreeIndex::new(3);
/// index.upsert(7, 70).unwrap();
///
/// let (leaf, pos) = index.get(7).unwrap();
/// assert_eq!(leaf[pos].value, 70);
///
/// index.delete(7).unwrap();
/// assert!(index.get(7).unwrap_err().is_not_found());
/// ```
#[derive(Debug)]
pub struct BTreeIndex {
    tree: RwLock<BTree>,
}

impl BTreeIndex {
    /// Create an empty index with the given node capacity.
    ///
    /// # Panics
    /// Panics if `max_degree < 2`.
    pub fn new(max_degree: usize) -> Self {
        Self::with_config(IndexConfig::new(max_degree))
    }

    /// Create an empty index from a config.
    ///
    /// # Panics
    /// Panics if the config is not valid.
    pub fn with_config(config: IndexConfig) -> Self {
        assert!(
            config.is_valid(),
            "structural invariant violation: invalid index config {:?}",
            config
        );
        info!(max_degree = config.max_degree, "creating btree index");

        Self {
            tree: RwLock::new(BTree::new(config.max_degree)),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert or overwrite `key`.
    pub fn upsert(&self, key: Key, value: Value) -> Result<()> {
        self.tree.write().upsert(key, value)
    }

    /// Insert `key`, failing with `DuplicateKey` if it is present.
    pub fn insert(&self, key: Key, value: Value) -> Result<()> {
        self.tree.write().insert(key, value)
    }

    /// Remove `key`.
    ///
    /// # Errors
    /// - `Error::KeyNotFound` if the key is absent
    /// - `Error::MergeImpossible` if the drained leaf has no sibling to
    ///   rebalance with and cannot be pruned; the index is left unchanged
    pub fn delete(&self, key: Key) -> Result<()> {
        self.tree.write().delete(key)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Look up `key`, returning a copy of its leaf's records and the
    /// position of the match.
    pub fn get(&self, key: Key) -> Result<(Vec<Record>, usize)> {
        self.tree.read().get(key)
    }

    pub fn get_value(&self, key: Key) -> Result<Value> {
        self.tree.read().get_value(key)
    }

    pub fn contains_key(&self, key: Key) -> bool {
        self.tree.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tree.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.read().is_empty()
    }

    pub fn height(&self) -> usize {
        self.tree.read().height()
    }

    pub fn node_count(&self) -> usize {
        self.tree.read().node_count()
    }

    pub fn max_degree(&self) -> usize {
        self.tree.read().max_degree()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.tree.read().stats()
    }

    pub fn reset_stats(&self) {
        self.tree.read().reset_stats();
    }

    /// Run the full structural check under the shared lock.
    pub fn validate(&self) -> Result<()> {
        self.tree.read().validate()
    }

    /// Borrow the tree for inspection.
    ///
    /// Writers block until the guard is dropped.
    pub fn tree(&self) -> RwLockReadGuard<'_, BTree> {
        self.tree.read()
    }
}

impl Default for BTreeIndex {
    fn default() -> Self {
        Self::with_config(IndexConfig::default())
    }
}
