// Configuration.
// Parsed from environment variables with defaults for every setting.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::paths;
use crate::github::client::{DEFAULT_PER_PAGE, GITHUB_API_BASE};
use crate::retry::RetryPolicy;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial credential. The settings surface may replace it later.
    pub token: Option<String>,
    pub api_base: String,
    /// TTL shared by every cache tier.
    pub cache_ttl: Duration,
    pub persist_debounce: Duration,
    /// Snapshot directory; `None` disables persistence.
    pub cache_dir: Option<PathBuf>,
    /// Derive `viewerFollowsTarget` from following lists.
    pub resolve_reverse: bool,
    pub retry: RetryPolicy,
    pub per_page: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            api_base: GITHUB_API_BASE.to_string(),
            cache_ttl: Duration::from_secs(600),
            persist_debounce: Duration::from_millis(500),
            cache_dir: paths::cache_dir(),
            resolve_reverse: false,
            retry: RetryPolicy::default(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let token = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty());

        let api_base = lookup("FOLLOWBACK_API_BASE").unwrap_or(defaults.api_base);

        let cache_ttl = lookup("FOLLOWBACK_CACHE_TTL_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);

        let persist_debounce = lookup("FOLLOWBACK_PERSIST_DEBOUNCE_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.persist_debounce);

        let cache_dir = if lookup("FOLLOWBACK_NO_PERSIST").is_some_and(|v| is_truthy(&v)) {
            None
        } else {
            lookup("FOLLOWBACK_CACHE_DIR")
                .map(PathBuf::from)
                .or(defaults.cache_dir)
        };

        let resolve_reverse = lookup("FOLLOWBACK_RESOLVE_REVERSE").is_some_and(|v| is_truthy(&v));

        let retry = RetryPolicy::new(
            lookup("FOLLOWBACK_RETRY_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.retry.attempts),
            lookup("FOLLOWBACK_RETRY_BASE_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
        );

        let per_page = lookup("FOLLOWBACK_PER_PAGE")
            .and_then(|v| v.parse().ok())
            .filter(|n| (1..=100).contains(n))
            .unwrap_or(defaults.per_page);

        Self {
            token,
            api_base,
            cache_ttl,
            persist_debounce,
            cache_dir,
            resolve_reverse,
            retry,
            per_page,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert!(config.token.is_none());
        assert_eq!(config.api_base, "https://api.github.com");
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(!config.resolve_reverse);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("GITHUB_TOKEN", "ghp_x"),
            ("FOLLOWBACK_CACHE_TTL_SECS", "60"),
            ("FOLLOWBACK_CACHE_DIR", "/tmp/fb"),
            ("FOLLOWBACK_RESOLVE_REVERSE", "true"),
            ("FOLLOWBACK_RETRY_ATTEMPTS", "5"),
            ("FOLLOWBACK_PER_PAGE", "50"),
        ]);
        assert_eq!(config.token.as_deref(), Some("ghp_x"));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/fb")));
        assert!(config.resolve_reverse);
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.per_page, 50);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("GITHUB_TOKEN", "  "),
            ("FOLLOWBACK_CACHE_TTL_SECS", "soon"),
            ("FOLLOWBACK_RETRY_ATTEMPTS", "0"),
            ("FOLLOWBACK_PER_PAGE", "500"),
        ]);
        assert!(config.token.is_none());
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.per_page, 100);
    }

    #[test]
    fn test_persistence_can_be_disabled() {
        let config = config(&[("FOLLOWBACK_NO_PERSIST", "1"), ("FOLLOWBACK_CACHE_DIR", "/tmp/fb")]);
        assert!(config.cache_dir.is_none());
    }
}
