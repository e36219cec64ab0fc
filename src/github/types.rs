// GitHub API response types.
// Defines structs for deserializing the user, follower, and rate limit endpoints.

use serde::{Deserialize, Serialize};

/// GitHub user as returned by `/user` and the follower listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    #[serde(default)]
    pub id: Option<u64>,
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}

/// Body of `GET /rate_limit`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimit,
}

/// Outcome of a single-direction follow check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowCheck {
    /// The API answered 204 No Content.
    Follows,
    /// The API answered 404 Not Found.
    NotFollowing,
    /// Any other status, or the request never completed.
    Unknown,
}

impl FollowCheck {
    /// Definite answer, if the check produced one.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            FollowCheck::Follows => Some(true),
            FollowCheck::NotFollowing => Some(false),
            FollowCheck::Unknown => None,
        }
    }
}

/// Items accumulated by walking a paginated listing.
#[derive(Debug, Clone)]
pub struct PagedItems<T> {
    pub items: Vec<T>,
    /// False when a page failed and pagination was abandoned.
    pub complete: bool,
}

// No `T: Default` bound.
impl<T> Default for PagedItems<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            complete: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paged_items_is_empty_and_incomplete() {
        let paged: PagedItems<Owner> = PagedItems::default();
        assert!(paged.items.is_empty());
        assert!(!paged.complete);
    }

    #[test]
    fn test_rate_limit_response_parses() {
        let json = r#"{"resources":{"core":{"limit":5000,"remaining":4999,"reset":1700000000,"used":1}},"rate":{}}"#;
        let parsed: RateLimitResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.resources.core.limit, 5000);
        assert_eq!(parsed.resources.core.remaining, 4999);
    }

    #[test]
    fn test_follow_check_as_bool() {
        assert_eq!(FollowCheck::Follows.as_bool(), Some(true));
        assert_eq!(FollowCheck::NotFollowing.as_bool(), Some(false));
        assert_eq!(FollowCheck::Unknown.as_bool(), None);
    }
}
