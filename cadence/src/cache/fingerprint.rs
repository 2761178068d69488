//! Approximate dataset signatures used as cache keys.

use std::fmt;

use serde::Serialize;

/// Cheap signature of a dataset.
///
/// Built from a label, the number of items, and a small rolling aggregate of
/// the item keys' lengths. This is **not** a content hash: two datasets with
/// the same label, size and key-length profile but different contents share
/// a fingerprint, and the cache will serve the stale derivation for the
/// second one. That collision risk is accepted in exchange for O(n) hashing
/// with no allocation, and is not detected at runtime.
///
/// Callers that cannot tolerate a stale hit should fold a revision counter
/// into the label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint {
    label: String,
    count: usize,
    aggregate: u64,
}

impl Fingerprint {
    /// Fingerprint from precomputed parts.
    pub fn new(label: impl Into<String>, count: usize, aggregate: u64) -> Self {
        Self {
            label: label.into(),
            count,
            aggregate,
        }
    }

    /// Fingerprint a sequence of item keys.
    pub fn from_keys<I, K>(label: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut count = 0usize;
        let mut aggregate = 0u64;
        for key in keys {
            count += 1;
            aggregate = aggregate
                .wrapping_mul(31)
                .wrapping_add(key.as_ref().len() as u64);
        }
        Self::new(label, count, aggregate)
    }

    /// Fingerprint a slice of records.
    pub fn of_records<R: Keyed>(label: impl Into<String>, records: &[R]) -> Self {
        Self::from_keys(label, records.iter().map(Keyed::key))
    }

    /// Dataset label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of items fingerprinted.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Key-length aggregate.
    pub fn aggregate(&self) -> u64 {
        self.aggregate
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{:x}", self.label, self.count, self.aggregate)
    }
}

/// A domain record with a stable identifying key.
pub trait Keyed {
    /// Key contributing to the dataset fingerprint.
    fn key(&self) -> &str;
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

impl Keyed for &str {
    fn key(&self) -> &str {
        self
    }
}
