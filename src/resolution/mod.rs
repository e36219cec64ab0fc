// Resolution cache.
// The authoritative follower-data store and the resolver callers query.

pub mod resolver;
pub mod store;
pub mod types;

pub use resolver::{Resolver, ResolverOptions};
pub use store::{FollowStore, StoreOptions};
pub use types::{ListsEntry, PairVerdict, UserSet, normalize_username, pair_key};
