//! Common types and utilities shared across btreedb.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants
//! - Error types
//! - Identifiers (PageId, NodeId)
//! - Keys, values and records

pub mod config;
pub mod error;
mod node_id;
mod page_id;
mod record;

pub use config::IndexConfig;
pub use error::{Error, Result};
pub use node_id::NodeId;
pub use page_id::PageId;
pub use record::{Key, Record, Value};
