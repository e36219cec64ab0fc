// Cache path utilities.
// Locates the snapshot files for the list and follow-check caches.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

const LISTS_SNAPSHOT: &str = "lists_cache_v1.json";
const CHECKS_SNAPSHOT: &str = "check_cache_v1.json";

/// Get the base cache directory (~/.cache/followback on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "followback").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Snapshot of the bulk follower/following list cache.
pub fn lists_snapshot_path(dir: &Path) -> PathBuf {
    dir.join(LISTS_SNAPSHOT)
}

/// Snapshot of the pairwise follow-check cache.
pub fn checks_snapshot_path(dir: &Path) -> PathBuf {
    dir.join(CHECKS_SNAPSHOT)
}
