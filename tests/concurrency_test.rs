//! Readers and writers sharing one index across threads.

use std::sync::Arc;
use std::thread;

use btreedb::{BTreeIndex, Key};

/// Readers run while a writer keeps splitting and merging nodes.
#[test]
fn test_readers_alongside_writer() {
    let index = Arc::new(BTreeIndex::new(4));
    // Even keys are stable; odd keys churn
    for key in (0..200).step_by(2) {
        index.upsert(key, key).unwrap();
    }

    let writer = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for round in 0..20 {
                for key in (1..200).step_by(2) {
                    index.upsert(key, round).unwrap();
                }
                for key in (1..200).step_by(2) {
                    index.delete(key).unwrap();
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for _ in 0..50 {
                    for key in (0..200).step_by(2) {
                        assert_eq!(index.get_value(key).unwrap(), key);
                    }
                    // A reader never sees a cascade half done
                    index.validate().unwrap();
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(index.len(), 100);
    index.validate().unwrap();
}

/// Writers on disjoint key ranges.
#[test]
fn test_concurrent_writers() {
    let index = Arc::new(BTreeIndex::new(5));

    let handles: Vec<_> = (0..4)
        .map(|t: Key| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for i in 0..250 {
                    let key = t * 1000 + i;
                    index.insert(key, -key).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(index.len(), 1000);
    for t in 0..4 {
        for i in 0..250 {
            let key = t * 1000 + i;
            assert_eq!(index.get_value(key).unwrap(), -key);
        }
    }
    assert_eq!(index.stats().upserts, 1000);
    index.validate().unwrap();
}
