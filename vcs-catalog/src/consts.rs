//! Constants for catalog configuration.
//!
//! This module defines environment variable names and defaults used when a
//! [crate::config::CatalogConfig] is built.

// Environment variable names

/// Environment variable overriding the streaming batch size.
///
/// # Example
///
/// ```bash
/// export VCS_CATALOG_BATCH_SIZE=10000
/// ```
pub const VCS_CATALOG_BATCH_SIZE_ENV: &str = "VCS_CATALOG_BATCH_SIZE";

/// Environment variable overriding how many operations a connection survives.
pub const VCS_CATALOG_KEEP_TOKENS_ENV: &str = "VCS_CATALOG_KEEP_TOKENS";

/// Environment variable naming the snapshot file of the in-memory catalog.
///
/// # Example
///
/// ```bash
/// export VCS_CATALOG_SNAPSHOT=$HOME/.vcs/catalog.bin.gz
/// ```
pub const VCS_CATALOG_SNAPSHOT_ENV: &str = "VCS_CATALOG_SNAPSHOT";

/// Environment variable overriding the prefix letter of minted VIDs.
pub const VCS_VID_PREFIX_ENV: &str = "VCS_VID_PREFIX";

// Defaults

/// Rows decoded per batch by streaming reads and writes.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Successful operations a connection stays open for.
pub const DEFAULT_KEEP_TOKENS: usize = 1;

/// Largest number of terms joined into one selector.
pub const MAX_SELECTOR_TERMS: usize = 10_000;
