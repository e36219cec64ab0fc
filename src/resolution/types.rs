// Follow-status data model.
// Username sets, cached follower lists, and pairwise verdicts.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lower-case, trimmed form of a username. Empty input yields `None`.
pub fn normalize_username(username: &str) -> Option<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}

/// Cache key for an ordered (viewer, target) pair.
pub fn pair_key(viewer: &str, target: &str) -> String {
    format!("{}::{}", viewer, target)
}

/// Set of normalized usernames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct UserSet(BTreeSet<String>);

impl UserSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, username: &str) -> bool {
        normalize_username(username).is_some_and(|name| self.0.contains(&name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for UserSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .filter_map(|name| normalize_username(name.as_ref()))
                .collect(),
        )
    }
}

impl From<Vec<String>> for UserSet {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().collect()
    }
}

impl From<UserSet> for Vec<String> {
    fn from(set: UserSet) -> Self {
        set.0.into_iter().collect()
    }
}

/// Follower (and optionally following) roster for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListsEntry {
    pub followers: UserSet,
    /// Present when the viewer is the authenticated user, or when reverse
    /// resolution asked for the public following list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<UserSet>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub error: bool,
}

impl ListsEntry {
    pub fn new(followers: UserSet, following: Option<UserSet>) -> Self {
        Self {
            followers,
            following,
            fetched_at: Utc::now(),
            error: false,
        }
    }

    /// Entry with no followers and no error flag.
    pub fn empty() -> Self {
        Self::new(UserSet::new(), None)
    }

    /// Entry recording that the listing could not be fetched.
    pub fn failed() -> Self {
        Self {
            error: true,
            ..Self::empty()
        }
    }

    /// Whether the followers list can answer membership questions.
    pub fn is_usable(&self) -> bool {
        !self.error && !self.followers.is_empty()
    }
}

/// Follow relationship between a viewer and a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairVerdict {
    /// `None` when derived from a followers-only list.
    pub viewer_follows_target: Option<bool>,
    pub target_follows_viewer: bool,
}

impl PairVerdict {
    /// Verdict derived from the viewer's rosters.
    pub fn from_lists(lists: &ListsEntry, target: &str, use_following: bool) -> Self {
        let viewer_follows_target = if use_following {
            lists.following.as_ref().map(|following| following.contains(target))
        } else {
            None
        };
        Self {
            viewer_follows_target,
            target_follows_viewer: lists.followers.contains(target),
        }
    }

    /// Verdict from two definite pairwise checks.
    pub fn definite(viewer_follows_target: bool, target_follows_viewer: bool) -> Self {
        Self {
            viewer_follows_target: Some(viewer_follows_target),
            target_follows_viewer,
        }
    }

    /// Both directions known and true.
    pub fn is_mutual(&self) -> bool {
        self.target_follows_viewer && self.viewer_follows_target == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Alice "), Some("alice".to_string()));
        assert_eq!(normalize_username("   "), None);
        assert_eq!(normalize_username(""), None);
    }

    #[test]
    fn test_user_set_is_case_insensitive() {
        let set: UserSet = ["Bob", "CAROL", "bob", ""].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("BOB"));
        assert!(set.contains("carol"));
        assert!(!set.contains(""));
    }

    #[test]
    fn test_lists_entry_wire_shape() {
        let mut entry = ListsEntry::new(["bob", "carol"].into_iter().collect(), None);
        entry.fetched_at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "followers": ["bob", "carol"],
                "fetchedAt": 1_700_000_000_000_i64,
                "error": false
            })
        );

        // Deserializing normalizes names and tolerates a missing error flag
        let parsed: ListsEntry = serde_json::from_value(serde_json::json!({
            "followers": ["Bob"],
            "following": ["Dave"],
            "fetchedAt": 1_700_000_000_000_i64
        }))
        .unwrap();
        assert!(parsed.followers.contains("bob"));
        assert!(parsed.following.unwrap().contains("dave"));
        assert!(!parsed.error);
    }

    #[test]
    fn test_pair_verdict_wire_shape() {
        let verdict = PairVerdict {
            viewer_follows_target: None,
            target_follows_viewer: true,
        };
        assert_eq!(
            serde_json::to_value(verdict).unwrap(),
            serde_json::json!({"viewerFollowsTarget": null, "targetFollowsViewer": true})
        );
    }

    #[test]
    fn test_verdict_from_lists() {
        let lists = ListsEntry::new(
            ["bob", "carol"].into_iter().collect(),
            Some(["carol"].into_iter().collect()),
        );

        let indeterminate = PairVerdict::from_lists(&lists, "Bob", false);
        assert_eq!(indeterminate.viewer_follows_target, None);
        assert!(indeterminate.target_follows_viewer);

        let resolved = PairVerdict::from_lists(&lists, "carol", true);
        assert!(resolved.is_mutual());
        assert_eq!(PairVerdict::from_lists(&lists, "bob", true).viewer_follows_target, Some(false));
    }

    #[test]
    fn test_usable_lists() {
        assert!(!ListsEntry::empty().is_usable());
        assert!(!ListsEntry::failed().is_usable());
        assert!(ListsEntry::new(["bob"].into_iter().collect(), None).is_usable());
    }
}
