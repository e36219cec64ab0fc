// GitHub API HTTP client.
// Handles optional authentication, rate limit tracking, and response status mapping.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{FollowbackError, Result};

use super::types::RateLimit;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Page size requested from listing endpoints (GitHub's maximum).
pub const DEFAULT_PER_PAGE: u32 = 100;

/// How long the `/user` lookup is reused for the same token.
pub const DEFAULT_IDENTITY_TTL: Duration = Duration::from_secs(10 * 60);

/// Memoised answer of `/user` for one token.
#[derive(Debug, Clone)]
pub(crate) struct IdentityMemo {
    pub token: String,
    pub login: String,
    pub fetched_at: DateTime<Utc>,
}

/// GitHub API client. The credential is read on every request, so changes
/// made through [`Credentials`] apply immediately.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    rate_limit: Mutex<RateLimit>,
    pub(crate) per_page: u32,
    pub(crate) identity_ttl: Duration,
    pub(crate) identity: Mutex<Option<IdentityMemo>>,
}

impl GitHubClient {
    /// Create a client against an API root ([`GITHUB_API_BASE`], an
    /// Enterprise host, or a test server).
    pub fn with_base_url(base_url: &str, credentials: Credentials) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("followback"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(FollowbackError::Api)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            rate_limit: Mutex::new(RateLimit::default()),
            per_page: DEFAULT_PER_PAGE,
            identity_ttl: DEFAULT_IDENTITY_TTL,
            identity: Mutex::new(None),
        })
    }

    /// Set the page size for listing endpoints (clamped to 1..=100).
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self
    }

    /// Set how long the authenticated identity is reused.
    pub fn with_identity_ttl(mut self, ttl: Duration) -> Self {
        self.identity_ttl = ttl;
        self
    }

    /// The credential handle this client reads from.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Get the most recently observed rate limit headers.
    pub fn rate_limit(&self) -> RateLimit {
        match self.rate_limit.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Absolute URL for an API path.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Whether `url` points under this client's API root.
    pub(crate) fn is_api_url(&self, url: &str) -> bool {
        url.strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
    }

    /// Make a GET request to an API path and require a success status.
    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        let response = self.send(&self.url(endpoint)).await?;
        self.check_response(response).await
    }

    /// Send a GET to an absolute URL without interpreting the status.
    pub async fn send(&self, url: &str) -> Result<Response> {
        let response = self
            .authorize(self.client.get(url))?
            .send()
            .await
            .map_err(FollowbackError::Api)?;

        self.update_rate_limit(&response);
        Ok(response)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        match self.credentials.get() {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| FollowbackError::InvalidCredential(e.to_string()))?;
                Ok(request.header(AUTHORIZATION, value))
            }
            None => Ok(request),
        }
    }

    /// Update rate limit from response headers.
    fn update_rate_limit(&self, response: &Response) {
        let header = |name: &str| -> Option<u64> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        };

        let mut rate_limit = match self.rate_limit.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(limit) = header("x-ratelimit-limit") {
            rate_limit.limit = limit;
        }
        if let Some(remaining) = header("x-ratelimit-remaining") {
            rate_limit.remaining = remaining;
        }
        if let Some(reset) = header("x-ratelimit-reset") {
            rate_limit.reset = reset;
        }

        debug!(
            url = %response.url(),
            status = response.status().as_u16(),
            remaining = rate_limit.remaining,
            limit = rate_limit.limit,
            reset = rate_limit.reset,
            "GitHub response"
        );
    }

    /// Check response status and convert errors.
    pub async fn check_response(&self, response: Response) -> Result<Response> {
        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => Ok(response),
            StatusCode::UNAUTHORIZED => Err(FollowbackError::Unauthorized),
            StatusCode::NOT_FOUND => {
                let url = response.url().to_string();
                Err(FollowbackError::NotFound(url))
            }
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
                if self.rate_limit().remaining == 0 =>
            {
                let reset_at = DateTime::from_timestamp(self.rate_limit().reset as i64, 0)
                    .map(|dt| dt.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                Err(FollowbackError::RateLimited { reset_at })
            }
            status => Err(FollowbackError::Other(format!(
                "HTTP {}: {}",
                status,
                truncate(&response.text().await.unwrap_or_default(), 300)
            ))),
        }
    }
}

/// Shorten a response body for logging.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
