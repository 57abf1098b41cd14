//! Error types for btreedb.

use thiserror::Error;

use crate::common::{Key, NodeId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors raised by the index.
///
/// Structural corruption detected in the middle of a split or merge is not
/// represented here: it panics, because the tree is already broken and any
/// further mutation would make it worse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No exact match for the key at the terminal leaf.
    #[error("Key {0} not found")]
    KeyNotFound(Key),

    /// `insert` found the key already present.
    ///
    /// `upsert` never returns this; it overwrites instead.
    #[error("Key {0} already exists")]
    DuplicateKey(Key),

    /// A deletion left a node underflowing and no sibling under the same
    /// parent could absorb it or lend it a key.
    ///
    /// The deletion is rolled back before this is returned.
    #[error("Cannot rebalance {node} after deleting key {key}")]
    MergeImpossible { key: Key, node: NodeId },

    /// Descent from the root failed to reach a leaf.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Reported by [`BTree::validate`](crate::index::btree::BTree::validate)
    /// when the tree breaks one of its structural invariants.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Whether the error reports a missing key.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::KeyNotFound(42);
        assert_eq!(format!("{}", err), "Key 42 not found");

        let err = Error::DuplicateKey(-7);
        assert_eq!(format!("{}", err), "Key -7 already exists");

        let err = Error::MergeImpossible {
            key: 3,
            node: NodeId::new(9),
        };
        assert_eq!(format!("{}", err), "Cannot rebalance Node(9) after deleting key 3");
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::KeyNotFound(1).is_not_found());
        assert!(!Error::DuplicateKey(1).is_not_found());
        assert!(!Error::Internal("x".into()).is_not_found());
    }

    #[test]
    fn test_result_type_alias() {
        fn might_fail() -> Result<u32> {
            Ok(42)
        }

        assert_eq!(might_fail().unwrap(), 42);
    }
}
