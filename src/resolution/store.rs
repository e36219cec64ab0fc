// Authoritative follower-data store.
// Owns the list and follow-check caches, their snapshots, and the fetches behind them.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::paths::{checks_snapshot_path, lists_snapshot_path};
use crate::cache::{
    Coalescer, DEFAULT_DEBOUNCE, DEFAULT_TTL, Debouncer, TtlMap, lock, read_snapshot,
    write_snapshot,
};
use crate::gateway::FollowGateway;

use super::types::{ListsEntry, PairVerdict, normalize_username, pair_key};

/// Tuning for [`FollowStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Lifetime of every cached list and verdict.
    pub ttl: Duration,
    /// Where snapshots live. `None` keeps everything in memory.
    pub persist_dir: Option<PathBuf>,
    /// Window in which cache writes collapse into one snapshot flush.
    pub debounce: Duration,
    /// Also fetch the public following list for non-authenticated viewers.
    pub resolve_reverse: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            persist_dir: None,
            debounce: DEFAULT_DEBOUNCE,
            resolve_reverse: false,
        }
    }
}

/// Cached answers to "who follows this viewer" and "does A follow B".
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct FollowStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    gateway: Arc<dyn FollowGateway>,
    options: StoreOptions,
    lists: Mutex<TtlMap<ListsEntry>>,
    checks: Mutex<TtlMap<PairVerdict>>,
    pending_lists: Coalescer<ListsEntry>,
    pending_checks: Coalescer<Option<PairVerdict>>,
    /// Bumped by `clear`; fetches started before a clear do not write back.
    generation: AtomicU64,
    persister: Option<Debouncer>,
}

impl FollowStore {
    pub fn new(gateway: Arc<dyn FollowGateway>, options: StoreOptions) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<StoreInner>| {
            let persister = options.persist_dir.as_ref().map(|_| {
                let weak = weak.clone();
                Debouncer::new(options.debounce, move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.write_snapshots();
                    }
                })
            });

            StoreInner {
                gateway,
                lists: Mutex::new(TtlMap::new(options.ttl)),
                checks: Mutex::new(TtlMap::new(options.ttl)),
                options,
                pending_lists: Coalescer::new(),
                pending_checks: Coalescer::new(),
                generation: AtomicU64::new(0),
                persister,
            }
        });

        Self { inner }
    }

    /// Whether the gateway will send a credential.
    pub fn has_credential(&self) -> bool {
        self.inner.gateway.has_credential()
    }

    /// Merge persisted snapshots into memory, dropping expired records.
    /// Returns the number of records loaded.
    pub fn load(&self) -> usize {
        let Some(dir) = &self.inner.options.persist_dir else {
            return 0;
        };

        let lists = match read_snapshot::<ListsEntry>(&lists_snapshot_path(dir)) {
            Ok(Some(snapshot)) => lock(&self.inner.lists).merge(snapshot),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Failed to read lists snapshot");
                0
            }
        };
        let checks = match read_snapshot::<PairVerdict>(&checks_snapshot_path(dir)) {
            Ok(Some(snapshot)) => lock(&self.inner.checks).merge(snapshot),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Failed to read follow-check snapshot");
                0
            }
        };

        info!(lists, checks, "Loaded persisted cache");
        lists + checks
    }

    /// Write snapshots now instead of waiting for the debounce timer.
    pub fn flush(&self) {
        match &self.inner.persister {
            Some(persister) => {
                debug!(pending = persister.is_pending(), "Flushing cache snapshot");
                persister.flush_now();
            }
            None => self.inner.write_snapshots(),
        }
    }

    /// Drop every cached list and verdict.
    pub fn clear(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        lock(&self.inner.lists).clear();
        lock(&self.inner.checks).clear();
        self.inner.pending_lists.clear();
        self.inner.pending_checks.clear();
        self.inner.schedule_persist();
        debug!("Follow store cleared");
    }

    /// Number of cached list entries (expired ones included until read).
    pub fn cached_lists(&self) -> usize {
        lock(&self.inner.lists).len()
    }

    /// Number of cached follow checks (expired ones included until read).
    pub fn cached_checks(&self) -> usize {
        lock(&self.inner.checks).len()
    }

    /// Follower roster for `viewer`, fetched at most once per TTL.
    ///
    /// Concurrent calls for the same viewer share one fetch. A failed fetch
    /// yields an `error` entry that is returned but not cached.
    pub async fn lists_for(&self, viewer: &str) -> ListsEntry {
        let Some(key) = normalize_username(viewer) else {
            return ListsEntry::empty();
        };

        if let Some(entry) = lock(&self.inner.lists).get(&key) {
            debug!(viewer = %key, followers = entry.followers.len(), "Lists cache hit");
            return entry;
        }

        let in_flight = self.inner.pending_lists.join_or_start(&key, || {
            let inner = Arc::clone(&self.inner);
            let generation = inner.generation.load(Ordering::Acquire);
            let key = key.clone();
            async move { inner.load_lists(key, generation).await }
        });
        in_flight.await
    }

    /// Both directions of the follow relationship via pairwise checks.
    ///
    /// `None` for blank input, or when either direction could not be
    /// determined. Only definite verdicts are cached.
    pub async fn check_pairwise(&self, viewer: &str, target: &str) -> Option<PairVerdict> {
        let viewer = normalize_username(viewer)?;
        let target = normalize_username(target)?;
        let key = pair_key(&viewer, &target);

        if let Some(verdict) = lock(&self.inner.checks).get(&key) {
            debug!(viewer = %viewer, target = %target, "Follow-check cache hit");
            return Some(verdict);
        }

        let in_flight = self.inner.pending_checks.join_or_start(&key, || {
            let inner = Arc::clone(&self.inner);
            let generation = inner.generation.load(Ordering::Acquire);
            async move { inner.load_check(viewer, target, generation).await }
        });
        in_flight.await
    }
}

impl StoreInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    async fn load_lists(&self, key: String, generation: u64) -> ListsEntry {
        let entry = self.fetch_lists(&key).await;

        if !entry.error && self.is_current(generation) {
            lock(&self.lists).insert(key, entry.clone());
            self.schedule_persist();
        }
        entry
    }

    async fn fetch_lists(&self, viewer: &str) -> ListsEntry {
        let gateway = &self.gateway;

        if let Some(login) = gateway.authenticated_login().await {
            if login == viewer {
                debug!(viewer, "Fetching authenticated follower lists");
                let (followers, following) =
                    tokio::join!(gateway.auth_followers(), gateway.auth_following());

                if !followers.is_error() {
                    let following = (!following.is_error()).then_some(following.users);
                    info!(
                        viewer,
                        followers = followers.users.len(),
                        following = following.as_ref().map_or(0, |f| f.len()),
                        "Fetched authenticated lists"
                    );
                    return ListsEntry::new(followers.users, following);
                }
                warn!(viewer, "Authenticated lists fetch failed, falling back to public endpoint");
            }
        }

        debug!(viewer, "Fetching public follower list");
        let (followers, following) = if self.options.resolve_reverse {
            let (followers, following) =
                tokio::join!(gateway.followers_of(viewer), gateway.following_of(viewer));
            (followers, Some(following))
        } else {
            (gateway.followers_of(viewer).await, None)
        };

        if followers.is_error() {
            warn!(viewer, "Follower list fetch failed");
            return ListsEntry::failed();
        }

        info!(viewer, followers = followers.users.len(), "Fetched public lists");
        ListsEntry::new(
            followers.users,
            following
                .filter(|roster| !roster.is_error())
                .map(|roster| roster.users),
        )
    }

    async fn load_check(
        &self,
        viewer: String,
        target: String,
        generation: u64,
    ) -> Option<PairVerdict> {
        let (forward, reverse) = tokio::join!(
            self.gateway.check_follows(&viewer, &target),
            self.gateway.check_follows(&target, &viewer)
        );

        match (forward.as_bool(), reverse.as_bool()) {
            (Some(viewer_follows_target), Some(target_follows_viewer)) => {
                let verdict = PairVerdict::definite(viewer_follows_target, target_follows_viewer);
                if self.is_current(generation) {
                    lock(&self.checks).insert(pair_key(&viewer, &target), verdict);
                    self.schedule_persist();
                }
                debug!(viewer = %viewer, target = %target, ?verdict, "Follow check resolved");
                Some(verdict)
            }
            _ => {
                warn!(
                    viewer = %viewer,
                    target = %target,
                    ?forward,
                    ?reverse,
                    "Follow check inconclusive"
                );
                None
            }
        }
    }

    fn schedule_persist(&self) {
        if let Some(persister) = &self.persister {
            persister.schedule();
        }
    }

    fn write_snapshots(&self) {
        let Some(dir) = &self.options.persist_dir else {
            return;
        };

        let lists = lock(&self.lists).snapshot();
        let checks = lock(&self.checks).snapshot();

        if let Err(e) = write_snapshot(&lists_snapshot_path(dir), &lists) {
            warn!(error = %e, "Failed to write lists snapshot");
        }
        if let Err(e) = write_snapshot(&checks_snapshot_path(dir), &checks) {
            warn!(error = %e, "Failed to write follow-check snapshot");
        }
        debug!(lists = lists.len(), checks = checks.len(), "Persisted cache snapshot");
    }
}
