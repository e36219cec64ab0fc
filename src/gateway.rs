// Remote data gateway seam.
// The resolution cache talks to GitHub only through this trait.

use async_trait::async_trait;

use crate::github::{FollowCheck, GitHubClient, Owner, PagedItems};
use crate::resolution::UserSet;

/// A normalized follower or following roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub users: UserSet,
    /// False when pagination stopped early.
    pub complete: bool,
}

impl Roster {
    /// Nothing was retrieved before the listing failed. Partial rosters are
    /// still considered usable.
    pub fn is_error(&self) -> bool {
        !self.complete && self.users.is_empty()
    }
}

impl From<PagedItems<Owner>> for Roster {
    fn from(paged: PagedItems<Owner>) -> Self {
        Self {
            users: paged.items.iter().map(|owner| owner.login.as_str()).collect(),
            complete: paged.complete,
        }
    }
}

/// Read-only access to follower data. Implementations never cache and
/// never fail loudly: failures surface as `None`, error rosters, or
/// [`FollowCheck::Unknown`].
#[async_trait]
pub trait FollowGateway: Send + Sync {
    /// Whether requests will carry a credential.
    fn has_credential(&self) -> bool;

    /// Lower-cased login of the credential owner, `None` when anonymous or
    /// on failure.
    async fn authenticated_login(&self) -> Option<String>;

    /// Followers of the authenticated user.
    async fn auth_followers(&self) -> Roster;

    /// Users the authenticated user follows.
    async fn auth_following(&self) -> Roster;

    /// Public followers of `username`.
    async fn followers_of(&self, username: &str) -> Roster;

    /// Public following list of `username`.
    async fn following_of(&self, username: &str) -> Roster;

    /// Whether `follower` follows `followee`.
    async fn check_follows(&self, follower: &str, followee: &str) -> FollowCheck;
}

#[async_trait]
impl FollowGateway for GitHubClient {
    fn has_credential(&self) -> bool {
        self.credentials().is_present()
    }

    async fn authenticated_login(&self) -> Option<String> {
        self.get_authenticated_login().await
    }

    async fn auth_followers(&self) -> Roster {
        self.get_auth_followers().await.into()
    }

    async fn auth_following(&self) -> Roster {
        self.get_auth_following().await.into()
    }

    async fn followers_of(&self, username: &str) -> Roster {
        self.get_followers(username).await.into()
    }

    async fn following_of(&self, username: &str) -> Roster {
        self.get_following(username).await.into()
    }

    async fn check_follows(&self, follower: &str, followee: &str) -> FollowCheck {
        GitHubClient::check_follows(self, follower, followee).await
    }
}
