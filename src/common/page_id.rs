//! Page identifier type.

use std::fmt;

/// Identifies the page a node would occupy in a persistence layer.
///
/// The in-memory index only stamps a fresh id on every node it allocates;
/// nothing in the tree algorithm reads it back.
///
/// # Example
/// ```
/// use btreedb::PageId;
///
/// let page_id = PageId::new(41).next();
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Used to represent "no page", and handed out once the id space is
    /// exhausted.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// The id following this one. Sticks at [`PageId::INVALID`].
    #[inline]
    pub fn next(self) -> PageId {
        PageId(self.0.saturating_add(1))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_invalid() {
        assert!(!PageId::INVALID.is_valid());
        assert_eq!(PageId::INVALID.0, u32::MAX);
    }

    #[test]
    fn test_next_saturates_at_invalid() {
        assert_eq!(PageId::new(0).next(), PageId::new(1));
        assert_eq!(PageId::new(u32::MAX - 1).next(), PageId::INVALID);
        assert_eq!(PageId::INVALID.next(), PageId::INVALID);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
        assert_eq!(format!("{}", PageId::INVALID), "Page(INVALID)");
    }
}
