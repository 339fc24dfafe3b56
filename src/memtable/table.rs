//! MemTable implementation
//!
//! BTreeMap-based multi-version table with RwLock for concurrency.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use parking_lot::{Mutex, RwLock};

use crate::wal::Operation;
use super::MemTableEntry;

/// Scan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone)]
struct Version {
    version: u64,
    entry: MemTableEntry,
}

/// In-memory table holding every version still visible to some reader
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, Vec<Version>>>,

    /// Keys with more than one version or a tombstone (prune candidates)
    stale: Mutex<BTreeSet<Vec<u8>>>,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            stale: Mutex::new(BTreeSet::new()),
        }
    }

    /// Value of `key` as of `version`
    pub fn get_at(&self, key: &[u8], version: u64) -> Option<Vec<u8>> {
        let data = self.data.read();
        data.get(key)
            .and_then(|versions| visible(versions, version))
            .cloned()
    }

    /// First visible pair inside the range, scanning in `direction`
    pub fn seek_at(
        &self,
        range: (Bound<&[u8]>, Bound<&[u8]>),
        version: u64,
        direction: Direction,
    ) -> Option<(Vec<u8>, Vec<u8>)> {
        if is_empty_range(range) {
            return None;
        }
        let data = self.data.read();
        let mut iter = data.range::<[u8], _>(range);
        let hit = |(k, versions): (&Vec<u8>, &Vec<Version>)| {
            visible(versions, version).map(|v| (k.clone(), v.clone()))
        };
        match direction {
            Direction::Forward => iter.find_map(hit),
            Direction::Backward => iter.rev().find_map(hit),
        }
    }

    /// Apply one committed transaction under `version`
    ///
    /// Deleting a key that is absent (or already deleted) records nothing.
    pub fn apply(&self, operations: &[Operation], version: u64) {
        let mut data = self.data.write();
        let mut stale = self.stale.lock();

        for op in operations {
            match op {
                Operation::Put { key, value } => {
                    let versions = data.entry(key.clone()).or_default();
                    versions.push(Version {
                        version,
                        entry: MemTableEntry::Value(value.clone()),
                    });
                    if versions.len() > 1 {
                        stale.insert(key.clone());
                    }
                }
                Operation::Delete { key } => {
                    let Some(versions) = data.get_mut(key.as_slice()) else {
                        continue;
                    };
                    let live = matches!(
                        versions.last(),
                        Some(Version { entry: MemTableEntry::Value(_), .. })
                    );
                    if live {
                        versions.push(Version {
                            version,
                            entry: MemTableEntry::Tombstone,
                        });
                        stale.insert(key.clone());
                    }
                }
            }
        }
    }

    /// Drop versions older than what a reader at `horizon` needs
    ///
    /// For each key only the newest version `<= horizon` and everything newer
    /// survive. Keys whose survivor is a tombstone at or below the horizon are
    /// removed entirely.
    pub fn prune(&self, horizon: u64) -> usize {
        let mut data = self.data.write();
        let mut stale = self.stale.lock();
        let mut removed = 0;

        stale.retain(|key| {
            let Some(versions) = data.get_mut(key.as_slice()) else {
                return false;
            };

            if let Some(keep_from) = versions.iter().rposition(|v| v.version <= horizon) {
                removed += keep_from;
                versions.drain(..keep_from);
            }

            let dead = versions.len() == 1
                && versions[0].version <= horizon
                && versions[0].entry == MemTableEntry::Tombstone;
            if dead {
                data.remove(key.as_slice());
                removed += 1;
                return false;
            }

            versions.len() > 1 || versions.iter().any(|v| v.entry == MemTableEntry::Tombstone)
        });

        removed
    }

    /// Every pair visible at `version`, in key order
    pub fn snapshot(&self, version: u64) -> Vec<(Vec<u8>, Vec<u8>)> {
        let data = self.data.read();
        data.iter()
            .filter_map(|(k, versions)| visible(versions, version).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    /// Number of keys live at `version`
    pub fn entry_count(&self, version: u64) -> usize {
        let data = self.data.read();
        data.values()
            .filter(|versions| visible(versions, version).is_some())
            .count()
    }

    /// Number of versions held, including tombstones and superseded values
    pub fn version_count(&self) -> usize {
        self.data.read().values().map(Vec::len).sum()
    }

    /// Approximate size of the held data in bytes
    pub fn size(&self) -> usize {
        let data = self.data.read();
        data.iter()
            .map(|(k, versions)| {
                k.len()
                    + versions
                        .iter()
                        .map(|v| match &v.entry {
                            MemTableEntry::Value(value) => value.len() + 8,
                            MemTableEntry::Tombstone => 8,
                        })
                        .sum::<usize>()
            })
            .sum()
    }

    /// Check if the table holds nothing at all
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

fn visible(versions: &[Version], at: u64) -> Option<&Vec<u8>> {
    versions
        .iter()
        .rev()
        .find(|v| v.version <= at)
        .and_then(|v| match &v.entry {
            MemTableEntry::Value(value) => Some(value),
            MemTableEntry::Tombstone => None,
        })
}

/// True if no key can fall inside `range`
///
/// `BTreeMap::range` panics on inverted bounds, so callers check first.
pub fn is_empty_range(range: (Bound<&[u8]>, Bound<&[u8]>)) -> bool {
    match range {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}
