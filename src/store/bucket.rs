//! Buckets and sequences

use std::fmt;
use std::ops::Bound;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::engine::{KvRead, WriteTxn};
use crate::error::{LarigotError, Result};
use super::codec;
use super::cursor::Cursor;

const COMPONENT_TAG: u8 = 0x01;
const META_TAG: u8 = 0x00;
const RECORD_TAG: u8 = 0x02;
const MARKER: u8 = b'b';
const SEQUENCE: u8 = b's';

/// Location of a bucket: the list of names from the root
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BucketPath {
    names: Vec<String>,
    prefix: Vec<u8>,
}

impl BucketPath {
    /// A top-level bucket
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            names: Vec::new(),
            prefix: Vec::new(),
        }
        .child(name)
    }

    /// A bucket nested inside this one
    pub fn child(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut prefix = self.prefix.clone();
        let len = u16::try_from(name.len()).unwrap_or(u16::MAX);
        prefix.push(COMPONENT_TAG);
        prefix.extend_from_slice(&len.to_be_bytes());
        prefix.extend_from_slice(&name.as_bytes()[..len as usize]);

        let mut names = self.names.clone();
        names.push(name);
        Self { names, prefix }
    }

    /// Enclosing bucket; `None` for top-level buckets
    pub fn parent(&self) -> Option<Self> {
        let (_, parents) = self.names.split_last()?;
        let (first, rest) = parents.split_first()?;
        Some(
            rest.iter()
                .fold(BucketPath::root(first.as_str()), |p, n| p.child(n.as_str())),
        )
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn meta_key(&self, tag: u8) -> Vec<u8> {
        let mut key = self.prefix.clone();
        key.push(META_TAG);
        key.push(tag);
        key
    }

    pub(crate) fn record_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + 1 + key.len());
        full.extend_from_slice(&self.prefix);
        full.push(RECORD_TAG);
        full.extend_from_slice(key);
        full
    }

    /// Bounds `[prefix|0x02, prefix|0x03)` covering exactly this bucket's records
    pub(crate) fn record_bounds(&self) -> (Vec<u8>, Vec<u8>) {
        let mut lo = self.prefix.clone();
        lo.push(RECORD_TAG);
        let mut hi = self.prefix.clone();
        hi.push(RECORD_TAG + 1);
        (lo, hi)
    }

    /// Length of the engine-key prefix in front of a record key
    pub(crate) fn record_prefix_len(&self) -> usize {
        self.prefix.len() + 1
    }
}

impl fmt::Display for BucketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names.join("/"))
    }
}

impl fmt::Debug for BucketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketPath({})", self)
    }
}

/// Bucket-level reads, available on both transaction kinds
pub trait BucketRead: KvRead + Sized {
    /// True if the bucket has been created
    fn bucket_exists(&self, bucket: &BucketPath) -> bool {
        KvRead::get(self, &bucket.meta_key(MARKER)).is_some()
    }

    /// Fail with `BucketNotFound` unless the bucket exists
    fn require_bucket(&self, bucket: &BucketPath) -> Result<()> {
        if self.bucket_exists(bucket) {
            Ok(())
        } else {
            Err(LarigotError::BucketNotFound(bucket.to_string()))
        }
    }

    /// Raw value of `key` in `bucket`
    fn read(&self, bucket: &BucketPath, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.require_bucket(bucket)?;
        Ok(KvRead::get(self, &bucket.record_key(key)))
    }

    /// Decoded record under `key` in `bucket`
    fn read_record<T: DeserializeOwned>(&self, bucket: &BucketPath, key: &[u8]) -> Result<Option<T>> {
        self.read(bucket, key)?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
    }

    /// Current value of the bucket's sequence (0 before first use)
    fn sequence(&self, bucket: &BucketPath) -> Result<u64> {
        self.require_bucket(bucket)?;
        Ok(KvRead::get(self, &bucket.meta_key(SEQUENCE))
            .and_then(|raw| raw.try_into().ok())
            .map(u64::from_be_bytes)
            .unwrap_or(0))
    }

    /// Ordered cursor over the bucket's records
    fn cursor(&self, bucket: &BucketPath) -> Result<Cursor<'_, Self>> {
        self.require_bucket(bucket)?;
        Ok(Cursor::new(self, bucket))
    }

    /// Number of records in the bucket
    fn record_count(&self, bucket: &BucketPath) -> Result<usize> {
        Ok(self.cursor(bucket)?.forward().count())
    }
}

impl<T: KvRead> BucketRead for T {}

/// Bucket-level writes
pub trait BucketWrite: BucketRead {
    /// Create the bucket unless it exists; its parent must exist
    fn create_bucket_if_not_exists(&mut self, bucket: &BucketPath) -> Result<()>;

    /// Store a raw value
    fn write(&mut self, bucket: &BucketPath, key: &[u8], value: Vec<u8>) -> Result<()>;

    /// Remove a key; absent keys are ignored
    fn remove(&mut self, bucket: &BucketPath, key: &[u8]) -> Result<()>;

    /// Increment and return the bucket's sequence
    fn next_sequence(&mut self, bucket: &BucketPath) -> Result<u64>;

    /// Encode and store a record
    fn write_record<T: Serialize>(&mut self, bucket: &BucketPath, key: &[u8], record: &T) -> Result<()> {
        let bytes = codec::encode(record)?;
        self.write(bucket, key, bytes)
    }
}

impl BucketWrite for WriteTxn<'_> {
    fn create_bucket_if_not_exists(&mut self, bucket: &BucketPath) -> Result<()> {
        if self.bucket_exists(bucket) {
            return Ok(());
        }
        if let Some(parent) = bucket.parent() {
            self.require_bucket(&parent)?;
        }
        tracing::debug!("Creating bucket {}", bucket);
        self.put(&bucket.meta_key(MARKER), Vec::new());
        Ok(())
    }

    fn write(&mut self, bucket: &BucketPath, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.require_bucket(bucket)?;
        self.put(&bucket.record_key(key), value);
        Ok(())
    }

    fn remove(&mut self, bucket: &BucketPath, key: &[u8]) -> Result<()> {
        self.require_bucket(bucket)?;
        self.delete(&bucket.record_key(key));
        Ok(())
    }

    fn next_sequence(&mut self, bucket: &BucketPath) -> Result<u64> {
        let next = self.sequence(bucket)? + 1;
        self.put(&bucket.meta_key(SEQUENCE), next.to_be_bytes().to_vec());
        Ok(next)
    }
}

/// Bounds over a bucket's records as borrowed slices
pub(crate) fn borrowed<'a>(lo: &'a Bound<Vec<u8>>, hi: &'a Bound<Vec<u8>>) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
    (lo.as_ref().map(Vec::as_slice), hi.as_ref().map(Vec::as_slice))
}
