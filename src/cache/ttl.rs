// In-memory TTL map.
// Expiry is lazy: stale records are dropped when read, never swept.

use std::collections::HashMap;
use std::time::Duration;

use super::store::{CacheRecord, Snapshot};

/// String-keyed map whose records expire after a fixed TTL.
#[derive(Debug, Clone)]
pub struct TtlMap<T> {
    entries: HashMap<String, CacheRecord<T>>,
    ttl: Duration,
}

impl<T: Clone> TtlMap<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`. An expired record is removed and reads as absent.
    pub fn get(&mut self, key: &str) -> Option<T> {
        match self.entries.get(key) {
            Some(record) if record.is_valid(self.ttl) => Some(record.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value stamped now.
    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), CacheRecord::new(value));
    }

    /// Store a record as-is, keeping its timestamp.
    pub fn insert_record(&mut self, key: impl Into<String>, record: CacheRecord<T>) {
        self.entries.insert(key.into(), record);
    }

    /// Merge persisted records, skipping expired ones. Returns how many were kept.
    pub fn merge(&mut self, snapshot: Snapshot<T>) -> usize {
        let mut loaded = 0;
        for (key, record) in snapshot {
            if record.is_valid(self.ttl) {
                self.entries.insert(key, record);
                loaded += 1;
            }
        }
        loaded
    }

    /// Copy of every unexpired record, ready to persist.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.entries
            .iter()
            .filter(|(_, record)| record.is_valid(self.ttl))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored records, expired ones included until read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
