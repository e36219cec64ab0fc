// Request coalescing.
// Concurrent callers asking for the same key share one in-flight future.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::lock;

type InFlight<T> = Shared<BoxFuture<'static, T>>;

/// Registry of in-flight work keyed by string.
///
/// The marker for a key is removed when its future completes, whatever the
/// outcome, so the next call after completion starts fresh work.
pub struct Coalescer<T: Clone> {
    pending: Arc<Mutex<HashMap<String, (u64, InFlight<T>)>>>,
    next_id: AtomicU64,
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the in-flight future for `key`, or start the one built by `start`.
    ///
    /// `start` is only called when nothing is in flight for `key`.
    pub fn join_or_start<F, Fut>(&self, key: &str, start: F) -> InFlight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut pending = lock(&self.pending);
        if let Some((_, in_flight)) = pending.get(key) {
            return in_flight.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.pending);
        let owned_key = key.to_string();
        let work = start();

        let in_flight = async move {
            let output = work.await;
            let mut pending = lock(&registry);
            // A clear() may have replaced the marker with newer work
            if pending.get(&owned_key).is_some_and(|(entry_id, _)| *entry_id == id) {
                pending.remove(&owned_key);
            }
            output
        }
        .boxed()
        .shared();

        pending.insert(key.to_string(), (id, in_flight.clone()));
        in_flight
    }

    /// Number of keys with work in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Forget every marker. Work already started still completes for the
    /// callers awaiting it.
    pub fn clear(&self) {
        lock(&self.pending).clear();
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
