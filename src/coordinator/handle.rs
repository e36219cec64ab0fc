// Client side of the coordinator boundary.
// A cheap, cloneable handle that turns every failure into `None`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::error::{FollowbackError, Result};
use crate::resolution::{ListsEntry, PairVerdict};

use super::FollowChannel;
use super::messages::{Envelope, QueryRequest, QueryResponse};

/// Sends requests to a running [`Coordinator`](super::Coordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Envelope>,
    timeout: Duration,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<Envelope>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    /// Send a request and wait for the answer.
    ///
    /// Resolves to `None` when the coordinator answered null and also when
    /// the channel failed; it never errors.
    pub async fn query(&self, request: QueryRequest) -> Option<QueryResponse> {
        let kind = request.kind();
        match self.try_query(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(kind, error = %e, "Coordinator request failed");
                None
            }
        }
    }

    /// Like [`query`](Self::query) but reports channel failures.
    pub async fn try_query(&self, request: QueryRequest) -> Result<Option<QueryResponse>> {
        let (reply, response) = oneshot::channel();

        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| FollowbackError::ChannelClosed)?;

        match tokio::time::timeout(self.timeout, response).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(FollowbackError::ChannelClosed),
            Err(_) => Err(FollowbackError::Other(format!(
                "Coordinator did not answer within {:?}",
                self.timeout
            ))),
        }
    }

    /// Whether the coordinator task is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl FollowChannel for CoordinatorHandle {
    async fn get_lists(&self, viewer: &str) -> Option<ListsEntry> {
        match self
            .query(QueryRequest::GetLists {
                viewer: viewer.to_string(),
            })
            .await
        {
            Some(QueryResponse::Lists(entry)) => Some(entry),
            _ => None,
        }
    }

    async fn check_follow(&self, viewer: &str, target: &str) -> Option<PairVerdict> {
        match self
            .query(QueryRequest::CheckFollow {
                viewer: viewer.to_string(),
                target: target.to_string(),
            })
            .await
        {
            Some(QueryResponse::Verdict(verdict)) => Some(verdict),
            _ => None,
        }
    }

    async fn clear(&self) {
        self.query(QueryRequest::Clear).await;
    }
}
