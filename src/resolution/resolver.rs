// Follow-status resolver.
// Answers resolve(viewer, target) through bulk lists, pairwise checks, and direct calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{Coalescer, DEFAULT_TTL, TtlMap, lock};
use crate::coordinator::FollowChannel;
use crate::gateway::FollowGateway;
use crate::retry::RetryPolicy;

use super::types::{ListsEntry, PairVerdict, normalize_username, pair_key};

/// Tuning for [`Resolver`].
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Lifetime of resolved verdicts, negative ones included.
    pub ttl: Duration,
    /// Retry policy for both coordinator round trips.
    pub retry: RetryPolicy,
    /// Fill `viewer_follows_target` from a following list when one is present.
    pub resolve_reverse: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            retry: RetryPolicy::default(),
            resolve_reverse: false,
        }
    }
}

/// Entry point for follow-status queries.
///
/// For a given (viewer, target) key at most one resolution runs at a time;
/// concurrent callers share its result. Results, including `None`, are
/// cached for the TTL. Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    channel: Arc<dyn FollowChannel>,
    gateway: Arc<dyn FollowGateway>,
    options: ResolverOptions,
    verdicts: Mutex<TtlMap<Option<PairVerdict>>>,
    pending: Coalescer<Option<PairVerdict>>,
    pending_lists: Coalescer<Option<ListsEntry>>,
    generation: AtomicU64,
}

impl Resolver {
    pub fn new(
        channel: Arc<dyn FollowChannel>,
        gateway: Arc<dyn FollowGateway>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                channel,
                gateway,
                verdicts: Mutex::new(TtlMap::new(options.ttl)),
                options,
                pending: Coalescer::new(),
                pending_lists: Coalescer::new(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Follow relationship between `viewer` and `target`.
    ///
    /// `None` for blank input (no network activity) or when every strategy
    /// failed. Usernames are case-insensitive; order matters.
    pub async fn resolve(&self, viewer: &str, target: &str) -> Option<PairVerdict> {
        let viewer = normalize_username(viewer)?;
        let target = normalize_username(target)?;
        let key = pair_key(&viewer, &target);

        if let Some(cached) = lock(&self.inner.verdicts).get(&key) {
            debug!(viewer = %viewer, target = %target, ?cached, "Verdict cache hit");
            return cached;
        }

        let in_flight = self.inner.pending.join_or_start(&key, || {
            let inner = Arc::clone(&self.inner);
            let generation = inner.generation.load(Ordering::Acquire);
            async move {
                let verdict = inner.resolve_uncached(&viewer, &target).await;
                if inner.generation.load(Ordering::Acquire) == generation {
                    lock(&inner.verdicts).insert(pair_key(&viewer, &target), verdict);
                }
                verdict
            }
        });
        in_flight.await
    }

    /// Cached verdict without triggering any work. The outer `None` means
    /// nothing is cached; `Some(None)` is a cached failure.
    pub fn cached(&self, viewer: &str, target: &str) -> Option<Option<PairVerdict>> {
        let viewer = normalize_username(viewer)?;
        let target = normalize_username(target)?;
        lock(&self.inner.verdicts).get(&pair_key(&viewer, &target))
    }

    /// Drop local verdicts and tell the coordinator to drop its caches.
    /// Called on navigation so no caller keeps serving stale answers.
    pub async fn clear(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        lock(&self.inner.verdicts).clear();
        let abandoned = self.inner.pending.in_flight();
        self.inner.pending.clear();
        self.inner.pending_lists.clear();
        self.inner.channel.clear().await;
        info!(abandoned, "Follow status caches cleared");
    }
}

impl ResolverInner {
    async fn resolve_uncached(&self, viewer: &str, target: &str) -> Option<PairVerdict> {
        if let Some(lists) = self.ensure_lists(viewer).await {
            if lists.is_usable() {
                let verdict = PairVerdict::from_lists(&lists, target, self.options.resolve_reverse);
                debug!(viewer, target, ?verdict, "Resolved from bulk lists");
                return Some(verdict);
            }
            debug!(
                viewer,
                error = lists.error,
                followers = lists.followers.len(),
                "Bulk lists unusable, falling back to pairwise check"
            );
        }

        let retry = self.options.retry;
        let via_channel = retry
            .run("checkFollow", |attempt| async move {
                let verdict = self.channel.check_follow(viewer, target).await;
                if verdict.is_none() {
                    debug!(viewer, target, attempt, "Pairwise check via coordinator gave no answer");
                }
                verdict
            })
            .await;
        if let Some(verdict) = via_channel {
            debug!(viewer, target, ?verdict, "Resolved via coordinator pairwise check");
            return Some(verdict);
        }

        let (forward, reverse) = tokio::join!(
            self.gateway.check_follows(viewer, target),
            self.gateway.check_follows(target, viewer)
        );
        if let (Some(viewer_follows_target), Some(target_follows_viewer)) =
            (forward.as_bool(), reverse.as_bool())
        {
            let verdict = PairVerdict::definite(viewer_follows_target, target_follows_viewer);
            debug!(viewer, target, ?verdict, "Resolved via direct pairwise check");
            return Some(verdict);
        }

        warn!(viewer, target, ?forward, ?reverse, "Follow status unresolved");
        None
    }

    /// Viewer's lists through the coordinator, with concurrent requests for
    /// the same viewer sharing one retried round trip. `None` when the
    /// channel gave no usable response on any attempt.
    async fn ensure_lists(&self, viewer: &str) -> Option<ListsEntry> {
        let channel = Arc::clone(&self.channel);
        let retry = self.options.retry;
        let owned = viewer.to_string();

        let in_flight = self.pending_lists.join_or_start(viewer, move || async move {
            let lists = retry
                .run("getLists", |attempt| {
                    let channel = Arc::clone(&channel);
                    let viewer = owned.clone();
                    async move {
                        let lists = channel.get_lists(&viewer).await;
                        if lists.is_none() {
                            debug!(viewer = %viewer, attempt, "getLists gave no response");
                        }
                        lists
                    }
                })
                .await;
            if lists.is_none() {
                warn!(viewer = %owned, "Coordinator unreachable for getLists");
            }
            lists
        });
        in_flight.await
    }
}
