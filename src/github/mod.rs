// GitHub API module.
// Provides the client, endpoints, and types used to read follower data.

pub mod client;
pub mod endpoints;
pub mod link;
pub mod types;

pub use client::GitHubClient;
pub use types::*;
