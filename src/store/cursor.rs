//! Ordered cursors over one bucket

use std::ops::Bound;

use crate::engine::KvRead;
use crate::memtable::Direction;
use super::bucket::{borrowed, BucketPath};

/// A position inside one bucket's records
///
/// Keys returned are the bucket-local keys (without the bucket prefix).
/// Moving past either end returns `None` and leaves the cursor unpositioned;
/// `next` on an unpositioned cursor behaves like `first`, `prev` like `last`.
pub struct Cursor<'t, T: KvRead> {
    txn: &'t T,
    lo: Vec<u8>,
    hi: Vec<u8>,
    prefix_len: usize,
    /// Full engine key of the current record
    position: Option<Vec<u8>>,
}

impl<'t, T: KvRead> Cursor<'t, T> {
    pub(crate) fn new(txn: &'t T, bucket: &BucketPath) -> Self {
        let (lo, hi) = bucket.record_bounds();
        Self {
            txn,
            lo,
            hi,
            prefix_len: bucket.record_prefix_len(),
            position: None,
        }
    }

    /// Smallest key
    pub fn first(&mut self) -> Option<(Vec<u8>, Vec<u8>)> {
        let lo = Bound::Included(self.lo.clone());
        let hi = Bound::Excluded(self.hi.clone());
        self.step(lo, hi, Direction::Forward)
    }

    /// Largest key
    pub fn last(&mut self) -> Option<(Vec<u8>, Vec<u8>)> {
        let lo = Bound::Included(self.lo.clone());
        let hi = Bound::Excluded(self.hi.clone());
        self.step(lo, hi, Direction::Backward)
    }

    /// Key after the current one
    pub fn next(&mut self) -> Option<(Vec<u8>, Vec<u8>)> {
        match self.position.take() {
            None => self.first(),
            Some(current) => {
                let hi = Bound::Excluded(self.hi.clone());
                self.step(Bound::Excluded(current), hi, Direction::Forward)
            }
        }
    }

    /// Key before the current one
    pub fn prev(&mut self) -> Option<(Vec<u8>, Vec<u8>)> {
        match self.position.take() {
            None => self.last(),
            Some(current) => {
                let lo = Bound::Included(self.lo.clone());
                self.step(lo, Bound::Excluded(current), Direction::Backward)
            }
        }
    }

    /// First key at or after `key`
    pub fn seek(&mut self, key: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        let mut start = self.lo.clone();
        start.extend_from_slice(key);
        let hi = Bound::Excluded(self.hi.clone());
        self.step(Bound::Included(start), hi, Direction::Forward)
    }

    /// Iterate from the first key to the last
    pub fn forward(self) -> CursorIter<'t, T> {
        CursorIter {
            cursor: self,
            direction: Direction::Forward,
            started: false,
        }
    }

    /// Iterate from the last key to the first
    pub fn backward(self) -> CursorIter<'t, T> {
        CursorIter {
            cursor: self,
            direction: Direction::Backward,
            started: false,
        }
    }

    fn step(
        &mut self,
        lo: Bound<Vec<u8>>,
        hi: Bound<Vec<u8>>,
        direction: Direction,
    ) -> Option<(Vec<u8>, Vec<u8>)> {
        let (full_key, value) = self.txn.seek(borrowed(&lo, &hi), direction)?;
        let local = full_key[self.prefix_len..].to_vec();
        self.position = Some(full_key);
        Some((local, value))
    }
}

/// Iterator adapter over a [`Cursor`]
pub struct CursorIter<'t, T: KvRead> {
    cursor: Cursor<'t, T>,
    direction: Direction,
    started: bool,
}

impl<T: KvRead> Iterator for CursorIter<'_, T> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        let item = match (self.direction, self.started) {
            (Direction::Forward, false) => self.cursor.first(),
            (Direction::Backward, false) => self.cursor.last(),
            (Direction::Forward, true) => self.cursor.next(),
            (Direction::Backward, true) => self.cursor.prev(),
        };
        self.started = true;
        if item.is_none() {
            // Keep an exhausted iterator exhausted.
            self.cursor.position = Some(match self.direction {
                Direction::Forward => self.cursor.hi.clone(),
                Direction::Backward => self.cursor.lo.clone(),
            });
        }
        item
    }
}
