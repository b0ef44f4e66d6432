use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::consts::{
    VCS_CATALOG_BATCH_SIZE_ENV, VCS_CATALOG_KEEP_TOKENS_ENV, VCS_CATALOG_SNAPSHOT_ENV,
    VCS_VID_PREFIX_ENV,
};

/// Read an environment variable and parse it, `None` when unset.
///
/// # Returns
/// - the parsed value, or the raw string when it does not parse
pub fn env_value<T: FromStr>(name: &str) -> Option<Result<T, String>> {
    env::var(name)
        .ok()
        .map(|raw| raw.trim().parse::<T>().map_err(|_| raw))
}

pub fn env_batch_size() -> Option<Result<usize, String>> {
    env_value(VCS_CATALOG_BATCH_SIZE_ENV)
}

pub fn env_keep_tokens() -> Option<Result<usize, String>> {
    env_value(VCS_CATALOG_KEEP_TOKENS_ENV)
}

pub fn env_vid_prefix() -> Option<Result<char, String>> {
    env_value(VCS_VID_PREFIX_ENV)
}

/// Get the snapshot path from the environment, with `~` and `$VARS` expanded.
pub fn env_snapshot_path() -> Option<PathBuf> {
    env::var(VCS_CATALOG_SNAPSHOT_ENV)
        .ok()
        .map(|raw| expand_path(&raw))
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    let expanded = shellexpand::full(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    PathBuf::from(expanded)
}
