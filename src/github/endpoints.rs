// GitHub API endpoint functions.
// Follower/following listings, the authenticated identity, and pairwise follow checks.

use std::collections::HashSet;

use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Result;

use super::client::{GitHubClient, IdentityMemo, truncate};
use super::link::next_page;
use super::types::{FollowCheck, Owner, PagedItems, RateLimit, RateLimitResponse};

/// Upper bound on pages walked for one listing.
pub const MAX_PAGES: usize = 500;

impl GitHubClient {
    /// Walk a paginated listing by following `rel="next"` links.
    ///
    /// Stops at the first failing page and returns what was accumulated,
    /// flagged as incomplete. Never retries. Next links outside the API
    /// root, repeated links, and listings past [`MAX_PAGES`] also stop the
    /// walk as incomplete.
    pub async fn fetch_paged<T: DeserializeOwned>(&self, url: &str) -> PagedItems<T> {
        let mut paged = PagedItems::default();
        let mut visited = HashSet::new();
        let mut next = Some(url.to_string());

        while let Some(page_url) = next.take() {
            if !self.is_api_url(&page_url) {
                warn!(url = %page_url, "Next page outside the API root, stopping");
                return paged;
            }
            if visited.len() >= MAX_PAGES {
                warn!(url, pages = visited.len(), "Page limit reached, stopping");
                return paged;
            }
            if !visited.insert(page_url.clone()) {
                warn!(url = %page_url, "Next page already fetched, stopping");
                return paged;
            }

            let response = match self.send(&page_url).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %page_url, error = %e, "Paged fetch failed");
                    return paged;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(
                    url = %page_url,
                    status = status.as_u16(),
                    body = %truncate(&body, 300),
                    "Paged fetch returned non-success status"
                );
                return paged;
            }

            next = response
                .headers()
                .get("link")
                .and_then(|v| v.to_str().ok())
                .and_then(next_page);

            match response.json::<Vec<T>>().await {
                Ok(items) => paged.items.extend(items),
                Err(e) => {
                    warn!(url = %page_url, error = %e, "Paged fetch returned malformed body");
                    return paged;
                }
            }
        }

        paged.complete = true;
        debug!(url, count = paged.items.len(), "Paged fetch completed");
        paged
    }

    /// Public followers of a user.
    pub async fn get_followers(&self, username: &str) -> PagedItems<Owner> {
        let url = self.url(&format!(
            "/users/{}/followers?per_page={}",
            urlencoding::encode(username),
            self.per_page
        ));
        self.fetch_paged(&url).await
    }

    /// Public following list of a user.
    pub async fn get_following(&self, username: &str) -> PagedItems<Owner> {
        let url = self.url(&format!(
            "/users/{}/following?per_page={}",
            urlencoding::encode(username),
            self.per_page
        ));
        self.fetch_paged(&url).await
    }

    /// Followers of the authenticated user.
    pub async fn get_auth_followers(&self) -> PagedItems<Owner> {
        let url = self.url(&format!("/user/followers?per_page={}", self.per_page));
        self.fetch_paged(&url).await
    }

    /// Users the authenticated user follows.
    pub async fn get_auth_following(&self) -> PagedItems<Owner> {
        let url = self.url(&format!("/user/following?per_page={}", self.per_page));
        self.fetch_paged(&url).await
    }

    /// Get the authenticated user.
    pub async fn get_current_user(&self) -> Result<Owner> {
        let response = self.get("/user").await?;
        let user: Owner = response.json().await?;
        Ok(user)
    }

    /// Lower-cased login of the credential's owner.
    ///
    /// Returns `None` without a request when no credential is configured,
    /// and `None` on any failure. Successful lookups are reused for the
    /// identity TTL while the token stays the same.
    pub async fn get_authenticated_login(&self) -> Option<String> {
        let token = self.credentials().get()?;

        if let Some(login) = self.memoised_identity(&token) {
            return Some(login);
        }

        match self.get_current_user().await {
            Ok(user) => {
                let login = user.login.to_lowercase();
                debug!(login = %login, "Resolved authenticated user");
                if let Ok(mut memo) = self.identity.lock() {
                    *memo = Some(IdentityMemo {
                        token,
                        login: login.clone(),
                        fetched_at: Utc::now(),
                    });
                }
                Some(login)
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve authenticated user");
                None
            }
        }
    }

    fn memoised_identity(&self, token: &str) -> Option<String> {
        let memo = self.identity.lock().ok()?;
        let memo = memo.as_ref()?;
        let age = Utc::now()
            .signed_duration_since(memo.fetched_at)
            .to_std()
            .ok()?;
        (memo.token == token && age < self.identity_ttl).then(|| memo.login.clone())
    }

    /// Whether `follower` follows `followee`.
    ///
    /// GitHub answers 204 when it does and 404 when it does not; anything
    /// else, including a transport failure, is `Unknown`.
    pub async fn check_follows(&self, follower: &str, followee: &str) -> FollowCheck {
        let url = self.url(&format!(
            "/users/{}/following/{}",
            urlencoding::encode(follower),
            urlencoding::encode(followee)
        ));

        match self.send(&url).await {
            Ok(response) => {
                let status = response.status();
                debug!(follower, followee, status = status.as_u16(), "Follow check");
                match status {
                    StatusCode::NO_CONTENT => FollowCheck::Follows,
                    StatusCode::NOT_FOUND => FollowCheck::NotFollowing,
                    _ => FollowCheck::Unknown,
                }
            }
            Err(e) => {
                warn!(follower, followee, error = %e, "Follow check failed");
                FollowCheck::Unknown
            }
        }
    }

    /// Current core rate limit bucket from `GET /rate_limit`.
    pub async fn get_rate_limit(&self) -> Result<RateLimit> {
        let response = self.get("/rate_limit").await?;
        let body: RateLimitResponse = response.json().await?;
        Ok(body.resources.core)
    }
}
