// Coordinator service.
// Owns the authoritative FollowStore and answers every request sent to it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::resolution::{FollowStore, ListsEntry};

use super::handle::CoordinatorHandle;
use super::messages::{Envelope, QueryRequest, QueryResponse};

/// Tuning for the coordinator boundary.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Queued requests before senders wait.
    pub queue_size: usize,
    /// How long a caller waits for a reply before treating the channel as failed.
    pub request_timeout: Duration,
    /// Refuse remote work while no credential is configured.
    pub require_credential: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            queue_size: 256,
            request_timeout: Duration::from_secs(30),
            require_credential: true,
        }
    }
}

/// Request dispatcher in front of a [`FollowStore`].
#[derive(Clone)]
pub struct Coordinator {
    store: FollowStore,
    require_credential: bool,
    /// Set once the missing-credential warning has been logged.
    warned_anonymous: Arc<AtomicBool>,
}

impl Coordinator {
    pub fn new(store: FollowStore, require_credential: bool) -> Self {
        Self {
            store,
            require_credential,
            warned_anonymous: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the service task. It runs until every handle is dropped, then
    /// flushes the store's snapshots.
    pub fn spawn(store: FollowStore, options: CoordinatorOptions) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<Envelope>(options.queue_size.max(1));
        let coordinator = Self::new(store, options.require_credential);
        let task = tokio::spawn(coordinator.run(rx));
        (CoordinatorHandle::new(tx, options.request_timeout), task)
    }

    async fn run(self, mut rx: mpsc::Receiver<Envelope>) {
        info!("Coordinator started");

        while let Some(Envelope { request, reply }) = rx.recv().await {
            let coordinator = self.clone();
            // One task per request so a slow fetch never blocks the queue
            tokio::spawn(async move {
                let response = coordinator.handle(request).await;
                if reply.send(response).is_err() {
                    debug!("Requester went away before the reply");
                }
            });
        }

        self.store.flush();
        info!("Coordinator stopped");
    }

    /// Answer one request. Always produces a value.
    pub async fn handle(&self, request: QueryRequest) -> Option<QueryResponse> {
        if self.require_credential && !self.store.has_credential() {
            if self.warned_anonymous.swap(true, Ordering::Relaxed) {
                debug!(kind = request.kind(), "No credential, answering without remote work");
            } else {
                warn!(kind = request.kind(), "No credential configured, answering without remote work");
            }
            return match request {
                QueryRequest::GetLists { .. } => Some(QueryResponse::Lists(ListsEntry::empty())),
                QueryRequest::CheckFollow { .. } => None,
                QueryRequest::Clear => self.clear(),
            };
        }

        match request {
            QueryRequest::GetLists { viewer } => {
                let lists = self.store.lists_for(&viewer).await;
                debug!(
                    viewer = %viewer,
                    followers = lists.followers.len(),
                    error = lists.error,
                    "getLists"
                );
                Some(QueryResponse::Lists(lists))
            }
            QueryRequest::CheckFollow { viewer, target } => {
                let verdict = self.store.check_pairwise(&viewer, &target).await;
                debug!(viewer = %viewer, target = %target, ?verdict, "checkFollow");
                verdict.map(QueryResponse::Verdict)
            }
            QueryRequest::Clear => self.clear(),
        }
    }

    fn clear(&self) -> Option<QueryResponse> {
        self.store.clear();
        Some(QueryResponse::Cleared { cleared: true })
    }
}
