//! Index statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by the index.
///
/// All fields are atomic so lookups running under the shared read lock can
/// bump counters without upgrading to the write lock.
///
/// # Memory Ordering
/// We use `Ordering::Relaxed` for all operations because:
/// - We only need atomicity (no partial updates)
/// - We don't need synchronization between different counters
/// - Statistics are "eventually consistent" - exact ordering doesn't matter
///
/// # Example
/// ```
/// use btreedb::IndexStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = IndexStats::new();
/// stats.splits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.splits.load(Ordering::Relaxed), 1);
/// ```
#[derive(Debug)]
pub struct IndexStats {
    /// Number of `get` calls.
    pub lookups: AtomicU64,

    /// Number of successful `upsert`/`insert` calls.
    pub upserts: AtomicU64,

    /// Number of successful `delete` calls.
    pub deletes: AtomicU64,

    /// Number of node splits, root splits included.
    pub splits: AtomicU64,

    /// Number of times the tree grew by one level.
    pub root_splits: AtomicU64,

    /// Number of nodes merged away into a sibling.
    pub merges: AtomicU64,

    /// Number of keys borrowed from a sibling instead of merging.
    pub borrows: AtomicU64,

    /// Number of times the tree shrank by one level.
    pub root_collapses: AtomicU64,
}

impl IndexStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            lookups: AtomicU64::new(0),
            upserts: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            splits: AtomicU64::new(0),
            root_splits: AtomicU64::new(0),
            merges: AtomicU64::new(0),
            borrows: AtomicU64::new(0),
            root_collapses: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    ///
    /// This returns a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            upserts: self.upserts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            splits: self.splits.load(Ordering::Relaxed),
            root_splits: self.root_splits.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
            borrows: self.borrows.load(Ordering::Relaxed),
            root_collapses: self.root_collapses.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.lookups.store(0, Ordering::Relaxed);
        self.upserts.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.splits.store(0, Ordering::Relaxed);
        self.root_splits.store(0, Ordering::Relaxed);
        self.merges.store(0, Ordering::Relaxed);
        self.borrows.store(0, Ordering::Relaxed);
        self.root_collapses.store(0, Ordering::Relaxed);
    }
}

impl Default for IndexStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of index statistics.
///
/// Unlike `IndexStats`, this is not atomic and can be safely
/// printed, compared, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub lookups: u64,
    pub upserts: u64,
    pub deletes: u64,
    pub splits: u64,
    pub root_splits: u64,
    pub merges: u64,
    pub borrows: u64,
    pub root_collapses: u64,
}

impl StatsSnapshot {
    /// Net change in tree height since the counters were last reset.
    pub fn height_delta(&self) -> i64 {
        self.root_splits as i64 - self.root_collapses as i64
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ lookups: {}, upserts: {}, deletes: {}, splits: {}, merges: {}, borrows: {}, height_delta: {} }}",
            self.lookups,
            self.upserts,
            self.deletes,
            self.splits,
            self.merges,
            self.borrows,
            self.height_delta()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = IndexStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_stats_bump_and_snapshot() {
        let stats = IndexStats::new();
        IndexStats::bump(&stats.splits);
        IndexStats::bump(&stats.splits);
        IndexStats::bump(&stats.root_splits);
        IndexStats::bump(&stats.root_collapses);
        IndexStats::bump(&stats.root_splits);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.splits, 2);
        assert_eq!(snapshot.height_delta(), 1);
    }

    #[test]
    fn test_stats_reset() {
        let stats = IndexStats::new();
        stats.lookups.fetch_add(100, Ordering::Relaxed);
        stats.merges.fetch_add(3, Ordering::Relaxed);

        stats.reset();

        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_stats_display() {
        let stats = IndexStats::new();
        stats.lookups.fetch_add(80, Ordering::Relaxed);
        stats.splits.fetch_add(5, Ordering::Relaxed);

        let display = format!("{}", stats.snapshot());

        assert!(display.contains("lookups: 80"));
        assert!(display.contains("splits: 5"));
        assert!(display.contains("height_delta: 0"));
    }
}
