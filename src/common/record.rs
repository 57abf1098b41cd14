//! Keys, values and the records stored in leaves.

use std::fmt;

/// Index key. Keys are totally ordered integers.
pub type Key = i64;

/// Integer payload stored alongside a key.
pub type Value = i64;

/// One key/value entry in a leaf.
///
/// Leaves keep their records sorted by `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Record {
    pub key: Key,
    pub value: Value,
}

impl Record {
    #[inline]
    pub fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=>{}", self.key, self.value)
    }
}
