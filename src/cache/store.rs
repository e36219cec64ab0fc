// Cache records and snapshot files.
// Handles TTL bookkeeping, JSON serialization, and atomic filesystem writes.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::Result;

/// Default TTL for every cache tier: 10 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// A cached value stamped with the time it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    /// The cached value.
    pub value: T,
    /// When the value was cached (milliseconds since the epoch on disk).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ts: DateTime<Utc>,
}

impl<T> CacheRecord<T> {
    /// Create a record stamped now.
    pub fn new(value: T) -> Self {
        Self::at(value, Utc::now())
    }

    /// Create a record with an explicit timestamp.
    pub fn at(value: T, ts: DateTime<Utc>) -> Self {
        Self { value, ts }
    }

    /// Age of the record, `None` when stamped in the future.
    pub fn age(&self) -> Option<Duration> {
        Utc::now().signed_duration_since(self.ts).to_std().ok()
    }

    /// Check if this record has expired based on TTL. Records from the
    /// future are treated as expired.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age().unwrap_or(Duration::MAX) >= ttl
    }

    /// Check if this record is still valid (not expired).
    pub fn is_valid(&self, ttl: Duration) -> bool {
        !self.is_expired(ttl)
    }
}

/// Mapping from cache key to record, as persisted on disk.
pub type Snapshot<T> = HashMap<String, CacheRecord<T>>;

/// Read a snapshot file. A missing file is `None`.
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<Snapshot<T>>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let snapshot: Snapshot<T> = serde_json::from_str(&contents)?;
    Ok(Some(snapshot))
}

/// Write a snapshot file, replacing any previous one.
pub fn write_snapshot<T: Serialize>(path: &Path, snapshot: &Snapshot<T>) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(snapshot)?;

    // Write atomically via temp file
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}
