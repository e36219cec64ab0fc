// Follow status tests.
// Drives the resolver through a live coordinator and store against an in-memory follow graph.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use followback::coordinator::{Coordinator, CoordinatorOptions};
use followback::gateway::{FollowGateway, Roster};
use followback::github::FollowCheck;
use followback::resolution::{
    FollowStore, PairVerdict, Resolver, ResolverOptions, StoreOptions,
};
use followback::retry::RetryPolicy;
use tempfile::TempDir;

/// Follow graph served from memory, counting every remote call.
#[derive(Default)]
struct Graph {
    credential: bool,
    login: Option<&'static str>,
    followers: HashMap<&'static str, Vec<&'static str>>,
    following: HashMap<&'static str, Vec<&'static str>>,
    edges: Vec<(&'static str, &'static str)>,
    lists_fail: bool,
    checks_fail: bool,
    list_fetches: AtomicUsize,
    check_calls: AtomicUsize,
}

impl Graph {
    fn roster(&self, lists: &HashMap<&'static str, Vec<&'static str>>, user: &str) -> Roster {
        if self.lists_fail {
            return Roster::default();
        }
        Roster {
            users: lists.get(user).into_iter().flatten().collect(),
            complete: true,
        }
    }

    fn list_fetches(&self) -> usize {
        self.list_fetches.load(Ordering::SeqCst)
    }

    fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FollowGateway for Graph {
    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn authenticated_login(&self) -> Option<String> {
        self.login.map(str::to_string)
    }

    async fn auth_followers(&self) -> Roster {
        self.list_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.roster(&self.followers, self.login.unwrap_or_default())
    }

    async fn auth_following(&self) -> Roster {
        self.roster(&self.following, self.login.unwrap_or_default())
    }

    async fn followers_of(&self, username: &str) -> Roster {
        self.list_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.roster(&self.followers, username)
    }

    async fn following_of(&self, username: &str) -> Roster {
        self.roster(&self.following, username)
    }

    async fn check_follows(&self, follower: &str, followee: &str) -> FollowCheck {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if self.checks_fail {
            FollowCheck::Unknown
        } else if self.edges.contains(&(follower, followee)) {
            FollowCheck::Follows
        } else {
            FollowCheck::NotFollowing
        }
    }
}

struct Stack {
    resolver: Resolver,
    store: FollowStore,
}

fn stack(graph: Arc<Graph>, ttl: Duration, persist_dir: Option<PathBuf>, require_credential: bool) -> Stack {
    build(graph, ttl, persist_dir, require_credential, false)
}

fn build(
    graph: Arc<Graph>,
    ttl: Duration,
    persist_dir: Option<PathBuf>,
    require_credential: bool,
    resolve_reverse: bool,
) -> Stack {
    let store = FollowStore::new(
        graph.clone(),
        StoreOptions {
            ttl,
            persist_dir,
            resolve_reverse,
            ..StoreOptions::default()
        },
    );
    store.load();

    let (handle, _task) = Coordinator::spawn(
        store.clone(),
        CoordinatorOptions {
            require_credential,
            ..CoordinatorOptions::default()
        },
    );
    let resolver = Resolver::new(
        Arc::new(handle),
        graph,
        ResolverOptions {
            ttl,
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
            resolve_reverse,
        },
    );

    Stack { resolver, store }
}

fn alice_graph() -> Arc<Graph> {
    Arc::new(Graph {
        credential: true,
        login: Some("alice"),
        followers: HashMap::from([("alice", vec!["bob", "carol"])]),
        following: HashMap::from([("alice", vec!["carol"])]),
        ..Graph::default()
    })
}

#[tokio::test]
async fn test_authenticated_viewer_resolves_from_lists() {
    let graph = alice_graph();
    let stack = stack(graph.clone(), Duration::from_secs(600), None, true);

    let verdict = stack.resolver.resolve("alice", "bob").await;
    assert_eq!(
        verdict,
        Some(PairVerdict {
            viewer_follows_target: None,
            target_follows_viewer: true,
        })
    );
    assert_eq!(graph.list_fetches(), 1);
    assert_eq!(graph.check_calls(), 0);

    // Same viewer, different target: served from the cached lists
    let verdict = stack.resolver.resolve("alice", "dave").await;
    assert_eq!(verdict.map(|v| v.target_follows_viewer), Some(false));
    assert_eq!(graph.list_fetches(), 1);
}

#[tokio::test]
async fn test_reverse_resolution_fills_viewer_direction() {
    let graph = Arc::new(Graph {
        credential: true,
        followers: HashMap::from([("dave", vec!["erin"])]),
        following: HashMap::from([("dave", vec!["erin", "frank"])]),
        ..Graph::default()
    });
    let stack = build(graph.clone(), Duration::from_secs(600), None, true, true);

    assert_eq!(
        stack.resolver.resolve("dave", "erin").await,
        Some(PairVerdict::definite(true, true))
    );
    assert_eq!(
        stack.resolver.resolve("dave", "Frank").await,
        Some(PairVerdict::definite(true, false))
    );
    assert_eq!(
        stack.resolver.resolve("dave", "gina").await,
        Some(PairVerdict::definite(false, false))
    );
    assert_eq!(graph.list_fetches(), 1);
    assert_eq!(graph.check_calls(), 0);
}

#[tokio::test]
async fn test_repeat_and_case_variants_hit_cache() {
    let graph = alice_graph();
    let stack = stack(graph.clone(), Duration::from_secs(600), None, true);

    let first = stack.resolver.resolve("alice", "bob").await;
    let second = stack.resolver.resolve("alice", "bob").await;
    let shouted = stack.resolver.resolve("ALICE", "Bob").await;

    assert_eq!(first, second);
    assert_eq!(first, shouted);
    assert_eq!(graph.list_fetches(), 1);
    assert!(stack.resolver.cached("Alice", "BOB").is_some());
}

#[tokio::test]
async fn test_concurrent_requests_share_one_fetch() {
    let graph = alice_graph();
    let stack = stack(graph.clone(), Duration::from_secs(600), None, true);

    let calls = (0..8).map(|_| stack.resolver.resolve("alice", "carol"));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| *r == results[0]));
    assert_eq!(results[0].map(|v| v.target_follows_viewer), Some(true));
    assert_eq!(graph.list_fetches(), 1);
}

#[tokio::test]
async fn test_concurrent_targets_share_viewer_lists() {
    let graph = alice_graph();
    let stack = stack(graph.clone(), Duration::from_secs(600), None, true);

    let (bob, carol, erin) = tokio::join!(
        stack.resolver.resolve("alice", "bob"),
        stack.resolver.resolve("alice", "carol"),
        stack.resolver.resolve("alice", "erin"),
    );

    assert_eq!(bob.map(|v| v.target_follows_viewer), Some(true));
    assert_eq!(carol.map(|v| v.target_follows_viewer), Some(true));
    assert_eq!(erin.map(|v| v.target_follows_viewer), Some(false));
    assert_eq!(graph.list_fetches(), 1);
}

#[tokio::test]
async fn test_expired_entries_refetch() {
    let graph = alice_graph();
    let stack = stack(graph.clone(), Duration::from_millis(50), None, true);

    stack.resolver.resolve("alice", "bob").await;
    assert_eq!(graph.list_fetches(), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;

    stack.resolver.resolve("alice", "bob").await;
    assert_eq!(graph.list_fetches(), 2);
}

#[tokio::test]
async fn test_failed_lists_fall_back_to_pairwise_check() {
    let graph = Arc::new(Graph {
        credential: true,
        lists_fail: true,
        edges: vec![("erin", "dave")],
        ..Graph::default()
    });
    let stack = stack(graph.clone(), Duration::from_secs(600), None, true);

    let verdict = stack.resolver.resolve("dave", "erin").await;
    assert_eq!(verdict, Some(PairVerdict::definite(false, true)));
    // Both directions checked once, by the store behind the coordinator
    assert_eq!(graph.check_calls(), 2);
    assert_eq!(stack.store.cached_checks(), 1);
    assert_eq!(stack.store.cached_lists(), 0);
}

#[tokio::test]
async fn test_anonymous_viewer_public_failure_scenario() {
    let graph = Arc::new(Graph {
        credential: false,
        lists_fail: true,
        edges: vec![("erin", "dave")],
        ..Graph::default()
    });
    let stack = stack(graph.clone(), Duration::from_secs(600), None, false);

    let verdict = stack.resolver.resolve("dave", "erin").await;
    assert_eq!(
        verdict,
        Some(PairVerdict {
            viewer_follows_target: Some(false),
            target_follows_viewer: true,
        })
    );
    assert_eq!(graph.list_fetches(), 1);
}

#[tokio::test]
async fn test_anonymous_viewer_without_remote_coordinator_work() {
    let graph = Arc::new(Graph {
        credential: false,
        edges: vec![("erin", "dave")],
        ..Graph::default()
    });
    let stack = stack(graph.clone(), Duration::from_secs(600), None, true);

    let verdict = stack.resolver.resolve("dave", "erin").await;
    assert_eq!(verdict, Some(PairVerdict::definite(false, true)));
    // The coordinator refused, so only the direct checks reached the gateway
    assert_eq!(graph.list_fetches(), 0);
    assert_eq!(graph.check_calls(), 2);
}

#[tokio::test]
async fn test_total_failure_is_cached_as_unknown() {
    let graph = Arc::new(Graph {
        credential: true,
        lists_fail: true,
        checks_fail: true,
        ..Graph::default()
    });
    let stack = stack(graph.clone(), Duration::from_secs(600), None, true);

    assert_eq!(stack.resolver.resolve("dave", "erin").await, None);
    let fetches = graph.list_fetches();
    let checks = graph.check_calls();
    assert!(fetches > 0);
    assert!(checks > 0);

    assert_eq!(stack.resolver.resolve("dave", "erin").await, None);
    assert_eq!(stack.resolver.cached("dave", "erin"), Some(None));
    assert_eq!(graph.list_fetches(), fetches);
    assert_eq!(graph.check_calls(), checks);
}

#[tokio::test]
async fn test_blank_usernames_resolve_to_none() {
    let graph = alice_graph();
    let stack = stack(graph.clone(), Duration::from_secs(600), None, true);

    assert_eq!(stack.resolver.resolve("", "bob").await, None);
    assert_eq!(stack.resolver.resolve("alice", "   ").await, None);
    assert_eq!(graph.list_fetches(), 0);
    assert_eq!(graph.check_calls(), 0);
}

#[tokio::test]
async fn test_clear_forces_refetch() {
    let graph = alice_graph();
    let stack = stack(graph.clone(), Duration::from_secs(600), None, true);

    stack.resolver.resolve("alice", "bob").await;
    stack.resolver.clear().await;
    assert_eq!(stack.store.cached_lists(), 0);

    stack.resolver.resolve("alice", "bob").await;
    assert_eq!(graph.list_fetches(), 2);
}

#[tokio::test]
async fn test_snapshots_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let graph = alice_graph();

    let first = stack(graph.clone(), Duration::from_secs(600), Some(temp_dir.path().to_path_buf()), true);
    let before = first.resolver.resolve("alice", "bob").await;
    first.store.flush();
    assert_eq!(graph.list_fetches(), 1);

    let second = stack(graph.clone(), Duration::from_secs(600), Some(temp_dir.path().to_path_buf()), true);
    assert_eq!(second.store.cached_lists(), 1);

    let after = second.resolver.resolve("alice", "bob").await;
    assert_eq!(before, after);
    assert_eq!(graph.list_fetches(), 1);
}
