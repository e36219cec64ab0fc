// Messages exchanged across the coordinator boundary.
// Serialized shapes match the JSON the page-side callers exchange.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::resolution::{ListsEntry, PairVerdict};

/// A request to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryRequest {
    /// `{type: "getLists", viewer}`
    GetLists { viewer: String },
    /// `{type: "checkFollow", viewer, target}`
    CheckFollow { viewer: String, target: String },
    /// `{type: "clear"}`: drop every cached answer.
    Clear,
}

impl QueryRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryRequest::GetLists { .. } => "getLists",
            QueryRequest::CheckFollow { .. } => "checkFollow",
            QueryRequest::Clear => "clear",
        }
    }
}

/// A non-null coordinator response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Lists(ListsEntry),
    Verdict(PairVerdict),
    Cleared { cleared: bool },
}

/// Request paired with the channel its answer goes back on.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub request: QueryRequest,
    pub reply: oneshot::Sender<Option<QueryResponse>>,
}
