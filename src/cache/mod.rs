// Cache module.
// TTL records, in-memory maps, snapshot persistence, coalescing, and the debounced flusher.

pub mod coalesce;
pub mod debounce;
pub mod paths;
pub mod store;
pub mod ttl;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use coalesce::Coalescer;
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use store::{CacheRecord, DEFAULT_TTL, Snapshot, read_snapshot, write_snapshot};
pub use ttl::TtlMap;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
