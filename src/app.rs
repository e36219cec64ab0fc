// App wiring.
// Builds the GitHub client, the authoritative store, the coordinator task, and the resolver.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::coordinator::{
    Coordinator, CoordinatorHandle, CoordinatorOptions, FollowChannel, QueryRequest, QueryResponse,
};
use crate::credentials::Credentials;
use crate::error::Result;
use crate::github::{GitHubClient, RateLimit};
use crate::resolution::{
    FollowStore, ListsEntry, PairVerdict, Resolver, ResolverOptions, StoreOptions,
};

/// How long shutdown waits for the coordinator to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A running follow-status stack.
pub struct App {
    /// Credential handle for the settings surface.
    pub credentials: Credentials,
    client: Arc<GitHubClient>,
    store: FollowStore,
    coordinator: CoordinatorHandle,
    resolver: Resolver,
    task: JoinHandle<()>,
}

impl App {
    /// Build and start everything. Must be called inside a Tokio runtime.
    pub fn start(config: &Config) -> Result<Self> {
        let credentials = Credentials::new(config.token.clone());
        let client = Arc::new(
            GitHubClient::with_base_url(&config.api_base, credentials.clone())?
                .with_per_page(config.per_page)
                .with_identity_ttl(config.cache_ttl),
        );

        let store = FollowStore::new(
            client.clone(),
            StoreOptions {
                ttl: config.cache_ttl,
                persist_dir: config.cache_dir.clone(),
                debounce: config.persist_debounce,
                resolve_reverse: config.resolve_reverse,
            },
        );
        store.load();

        let (coordinator, task) = Coordinator::spawn(store.clone(), CoordinatorOptions::default());

        let resolver = Resolver::new(
            Arc::new(coordinator.clone()),
            client.clone(),
            ResolverOptions {
                ttl: config.cache_ttl,
                retry: config.retry,
                resolve_reverse: config.resolve_reverse,
            },
        );

        info!(
            authenticated = credentials.is_present(),
            persist = config.cache_dir.is_some(),
            "Follow status stack started"
        );

        Ok(Self {
            credentials,
            client,
            store,
            coordinator,
            resolver,
            task,
        })
    }

    /// The resolver handed to page-side callers.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Follow relationship between `viewer` and `target`.
    pub async fn resolve(&self, viewer: &str, target: &str) -> Option<PairVerdict> {
        self.resolver.resolve(viewer, target).await
    }

    /// Raw coordinator query.
    pub async fn query(&self, request: QueryRequest) -> Option<QueryResponse> {
        self.coordinator.query(request).await
    }

    /// Viewer's lists as served by the coordinator.
    pub async fn lists(&self, viewer: &str) -> Option<ListsEntry> {
        self.coordinator.get_lists(viewer).await
    }

    /// Navigation signal: drop every cached answer in every tier.
    pub async fn invalidate(&self) {
        self.resolver.clear().await;
    }

    /// Core rate limit bucket, for the settings surface.
    pub async fn rate_limit(&self) -> Result<RateLimit> {
        self.client.get_rate_limit().await
    }

    /// Stop the coordinator and write snapshots.
    pub async fn shutdown(self) {
        let Self {
            store,
            coordinator,
            resolver,
            task,
            ..
        } = self;

        drop(resolver);
        drop(coordinator);
        if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
            warn!("Coordinator still busy at shutdown");
        }
        store.flush();
    }
}
