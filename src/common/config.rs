//! Configuration constants and index settings.

use crate::common::record::{Key, Value};

/// Size of a page in bytes (4KB).
///
/// A B-tree node models one page worth of records, so the default fan-out
/// of the index is derived from this value.
pub const PAGE_SIZE: usize = 4096;

/// Bytes occupied by one key.
pub const KEY_SIZE: usize = std::mem::size_of::<Key>();

/// Bytes occupied by one value.
pub const VALUE_SIZE: usize = std::mem::size_of::<Value>();

/// Bytes occupied by one key/value record in a leaf.
pub const RECORD_SIZE: usize = KEY_SIZE + VALUE_SIZE;

/// Smallest legal `max_degree`.
pub const MIN_MAX_DEGREE: usize = 2;

/// Number of records that fit in a single page (256 with 4KB pages).
pub const DEFAULT_MAX_DEGREE: usize = PAGE_SIZE / RECORD_SIZE;

/// Settings for a [`BTreeIndex`](crate::index::BTreeIndex).
///
/// # Example
/// ```
/// use btreedb::IndexConfig;
///
/// let config = IndexConfig::new(3);
/// assert_eq!(config.max_degree, 3);
///
/// assert_eq!(IndexConfig::default().max_degree, 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Node capacity. A leaf splits once it holds `max_degree` records and an
    /// internal node once it holds `max_degree` separator keys.
    pub max_degree: usize,
}

impl IndexConfig {
    /// Create a config with an explicit degree.
    #[inline]
    pub fn new(max_degree: usize) -> Self {
        Self { max_degree }
    }

    /// Derive the degree from a page size so one node fills one page.
    ///
    /// Pages too small to hold [`MIN_MAX_DEGREE`] records are clamped up.
    pub fn for_page_size(page_size: usize) -> Self {
        Self {
            max_degree: (page_size / RECORD_SIZE).max(MIN_MAX_DEGREE),
        }
    }

    /// Whether the degree satisfies `max_degree >= 2`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.max_degree >= MIN_MAX_DEGREE
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEGREE)
    }
}
