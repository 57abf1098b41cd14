//! B+ tree index.
//!
//! - [`node`] - node body, kind and local search
//! - [`arena`] - slot storage addressed by [`NodeId`](crate::common::NodeId)
//! - [`tree`] - lookup, insert and delete entry points
//! - `split` / `merge` - overflow and underflow repair
//! - `validate` - full structural check
//! - [`index`] - the locked, shareable front

pub mod arena;
pub mod index;
mod merge;
pub mod node;
mod split;
pub mod tree;
mod validate;

pub use arena::NodeArena;
pub use index::BTreeIndex;
pub use node::{Node, NodeBody, NodeKind, Search};
pub use tree::BTree;
