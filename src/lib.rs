// Followback library.
// Resolves whether GitHub users follow each other, backed by a persisted two-tier cache.

pub mod app;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod github;
pub mod resolution;
pub mod retry;

pub use app::App;
pub use config::Config;
pub use credentials::Credentials;
pub use error::{FollowbackError, Result};
pub use gateway::{FollowGateway, Roster};
pub use resolution::{ListsEntry, PairVerdict, Resolver};
