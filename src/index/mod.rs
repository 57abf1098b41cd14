//! Index structures.

pub mod btree;
mod stats;

pub use btree::{BTree, BTreeIndex, Node, NodeBody, NodeKind};
pub use stats::{IndexStats, StatsSnapshot};
