//! Tests for MemTable
//!
//! These tests verify:
//! - Versioned reads (each reader sees its snapshot)
//! - Tombstones and deletes of absent keys
//! - Ordered range seeks in both directions
//! - Pruning of versions below the oldest reader
//! - Concurrent readers during writes

use std::ops::Bound;
use std::sync::Arc;
use std::thread;

use larigot::memtable::{is_empty_range, Direction, MemTable};
use larigot::wal::Operation;

// =============================================================================
// Helper Functions
// =============================================================================

fn put(key: &[u8], value: &[u8]) -> Operation {
    Operation::Put {
        key: key.to_vec(),
        value: value.to_vec(),
    }
}

fn delete(key: &[u8]) -> Operation {
    Operation::Delete { key: key.to_vec() }
}

fn all() -> (Bound<&'static [u8]>, Bound<&'static [u8]>) {
    (Bound::Unbounded, Bound::Unbounded)
}

// =============================================================================
// Versioned Read Tests
// =============================================================================

#[test]
fn test_new_memtable_is_empty() {
    let table = MemTable::new();
    assert!(table.is_empty());
    assert_eq!(table.size(), 0);
    assert_eq!(table.get_at(b"key", u64::MAX), None);
}

#[test]
fn test_reads_see_their_version() {
    let table = MemTable::new();
    table.apply(&[put(b"key", b"one")], 1);
    table.apply(&[put(b"key", b"two")], 2);

    assert_eq!(table.get_at(b"key", 0), None);
    assert_eq!(table.get_at(b"key", 1), Some(b"one".to_vec()));
    assert_eq!(table.get_at(b"key", 2), Some(b"two".to_vec()));
    assert_eq!(table.get_at(b"key", 99), Some(b"two".to_vec()));
    assert_eq!(table.version_count(), 2);
}

#[test]
fn test_transaction_applies_under_one_version() {
    let table = MemTable::new();
    table.apply(&[put(b"a", b"1"), put(b"b", b"2"), put(b"c", b"3")], 5);

    assert_eq!(table.entry_count(4), 0);
    assert_eq!(table.entry_count(5), 3);
}

#[test]
fn test_tombstone_hides_value_from_later_versions() {
    let table = MemTable::new();
    table.apply(&[put(b"key", b"value")], 1);
    table.apply(&[delete(b"key")], 2);

    assert_eq!(table.get_at(b"key", 1), Some(b"value".to_vec()));
    assert_eq!(table.get_at(b"key", 2), None);
    assert_eq!(table.entry_count(2), 0);
}

#[test]
fn test_delete_of_absent_key_records_nothing() {
    let table = MemTable::new();
    table.apply(&[delete(b"ghost")], 1);
    assert!(table.is_empty());

    table.apply(&[put(b"key", b"v")], 2);
    table.apply(&[delete(b"key")], 3);
    table.apply(&[delete(b"key")], 4);
    assert_eq!(table.version_count(), 2);
}

// =============================================================================
// Seek Tests
// =============================================================================

#[test]
fn test_seek_forward_and_backward() {
    let table = MemTable::new();
    table.apply(&[put(b"b", b"2"), put(b"a", b"1"), put(b"c", b"3")], 1);

    assert_eq!(
        table.seek_at(all(), 1, Direction::Forward),
        Some((b"a".to_vec(), b"1".to_vec()))
    );
    assert_eq!(
        table.seek_at(all(), 1, Direction::Backward),
        Some((b"c".to_vec(), b"3".to_vec()))
    );

    let after_a = (Bound::Excluded(&b"a"[..]), Bound::Unbounded);
    assert_eq!(table.seek_at(after_a, 1, Direction::Forward).unwrap().0, b"b".to_vec());
}

#[test]
fn test_seek_skips_keys_invisible_at_version() {
    let table = MemTable::new();
    table.apply(&[put(b"a", b"1")], 1);
    table.apply(&[delete(b"a"), put(b"b", b"2")], 2);

    assert_eq!(table.seek_at(all(), 1, Direction::Forward).unwrap().0, b"a".to_vec());
    assert_eq!(table.seek_at(all(), 2, Direction::Forward).unwrap().0, b"b".to_vec());
    assert_eq!(table.seek_at(all(), 2, Direction::Backward).unwrap().0, b"b".to_vec());
}

#[test]
fn test_empty_ranges_do_not_panic() {
    let table = MemTable::new();
    table.apply(&[put(b"k", b"v")], 1);

    let equal_excluded = (Bound::Excluded(&b"k"[..]), Bound::Excluded(&b"k"[..]));
    let inverted = (Bound::Included(&b"z"[..]), Bound::Included(&b"a"[..]));
    assert!(is_empty_range(equal_excluded));
    assert!(is_empty_range(inverted));
    assert!(!is_empty_range((Bound::Included(&b"k"[..]), Bound::Included(&b"k"[..]))));

    assert_eq!(table.seek_at(equal_excluded, 1, Direction::Forward), None);
    assert_eq!(table.seek_at(inverted, 1, Direction::Backward), None);
}

// =============================================================================
// Prune Tests
// =============================================================================

#[test]
fn test_prune_keeps_versions_readers_need() {
    let table = MemTable::new();
    table.apply(&[put(b"key", b"one")], 1);
    table.apply(&[put(b"key", b"two")], 2);
    table.apply(&[put(b"key", b"three")], 3);

    // A reader still pinned at version 2
    table.prune(2);
    assert_eq!(table.get_at(b"key", 2), Some(b"two".to_vec()));
    assert_eq!(table.get_at(b"key", 3), Some(b"three".to_vec()));
    assert_eq!(table.version_count(), 2);

    table.prune(3);
    assert_eq!(table.version_count(), 1);
    assert_eq!(table.get_at(b"key", 3), Some(b"three".to_vec()));
}

#[test]
fn test_prune_removes_dead_keys() {
    let table = MemTable::new();
    table.apply(&[put(b"key", b"value"), put(b"other", b"x")], 1);
    table.apply(&[delete(b"key")], 2);

    table.prune(1);
    assert_eq!(table.get_at(b"key", 1), Some(b"value".to_vec()));

    table.prune(2);
    assert_eq!(table.get_at(b"key", 2), None);
    assert_eq!(table.version_count(), 1);
    assert_eq!(table.snapshot(2), vec![(b"other".to_vec(), b"x".to_vec())]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_readers_see_stable_snapshot() {
    let table = Arc::new(MemTable::new());
    for i in 0..100u64 {
        table.apply(&[put(&i.to_be_bytes(), b"v")], i + 1);
    }

    let writer = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            for i in 100..200u64 {
                table.apply(&[put(&i.to_be_bytes(), b"v")], i + 1);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for _ in 0..50 {
                    assert_eq!(table.entry_count(100), 100);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(table.entry_count(200), 200);
}
