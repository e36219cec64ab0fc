// Query coordinator.
// Message boundary between callers and the single authoritative follow store.

pub mod handle;
pub mod messages;
pub mod service;

use async_trait::async_trait;

use crate::resolution::{ListsEntry, PairVerdict};

pub use handle::CoordinatorHandle;
pub use messages::{QueryRequest, QueryResponse};
pub use service::{Coordinator, CoordinatorOptions};

/// What the resolver needs from the coordinator boundary.
///
/// `None` means no usable answer, whether the coordinator answered null or
/// the channel failed.
#[async_trait]
pub trait FollowChannel: Send + Sync {
    /// Follower roster for `viewer`. Any lists entry counts as usable, even
    /// an empty one.
    async fn get_lists(&self, viewer: &str) -> Option<ListsEntry>;

    /// Definite verdict for the pair, if the coordinator produced one.
    async fn check_follow(&self, viewer: &str, target: &str) -> Option<PairVerdict>;

    /// Propagate a cache clear to the authoritative store.
    async fn clear(&self);
}
