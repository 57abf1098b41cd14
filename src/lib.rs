//! btreedb - an in-memory B+ tree index over integer keys.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           BTreeIndex                            │
//! │             RwLock<BTree>: many readers, one writer             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                  BTree (index/btree/)                    │   │
//! │  │     get / upsert / delete  →  split / merge cascades     │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                NodeArena (index/btree/)                  │   │
//! │  │   Vec<Option<Node>> + free list, linked by NodeId        │   │
//! │  │   Node = Leaf { records } | Internal { keys, children }  │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │         IndexStats: atomic operation counters            │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, NodeId, Record, Error, config)
//! - [`index`] - The B+ tree, its arena, statistics and locked front
//!
//! # Quick Start
//! ```
//! use btreedb::{BTreeIndex, IndexConfig};
//!
//! let index = BTreeIndex::with_config(IndexConfig::new(3));
//! for key in [5, 2, 1, 4] {
//!     index.upsert(key, key * 100).unwrap();
//! }
//!
//! assert_eq!(index.get_value(2).unwrap(), 200);
//! assert_eq!(index.height(), 2);
//!
//! index.delete(2).unwrap();
//! assert!(!index.contains_key(2));
//! ```

pub mod common;
pub mod index;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, IndexConfig, Key, NodeId, PageId, Record, Result, Value};

pub use index::{BTree, BTreeIndex, IndexStats, Node, NodeBody, NodeKind, StatsSnapshot};
