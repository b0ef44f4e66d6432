use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use vcs_core::consts::DEFAULT_VID_PREFIX;
use vcs_core::{VcsError, Vid};

use crate::consts::{DEFAULT_BATCH_SIZE, DEFAULT_KEEP_TOKENS, MAX_SELECTOR_TERMS};
use crate::utils::{env_batch_size, env_keep_tokens, env_snapshot_path, env_vid_prefix, expand_path};

///
/// Settings of a catalog session.
///
/// Can be read from a TOML file:
///
/// ```toml
/// batch_size = 5000
/// keep_tokens = 1
/// max_selector_terms = 10000
/// vid_prefix = "V"
/// snapshot = "~/.vcs/catalog.bin.gz"
/// ```
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub batch_size: usize,
    pub keep_tokens: usize,
    pub max_selector_terms: usize,
    pub vid_prefix: char,
    pub snapshot: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum CatalogConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type CatalogConfigResult<T> = std::result::Result<T, CatalogConfigError>;

impl From<CatalogConfigError> for VcsError {
    fn from(value: CatalogConfigError) -> Self {
        match value {
            CatalogConfigError::Io(err) => VcsError::Io(err),
            other => VcsError::Usage(other.to_string()),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            keep_tokens: DEFAULT_KEEP_TOKENS,
            max_selector_terms: MAX_SELECTOR_TERMS,
            vid_prefix: DEFAULT_VID_PREFIX,
            snapshot: None,
        }
    }
}

impl CatalogConfig {
    ///
    /// Defaults, overridden by whatever the `VCS_*` environment variables set.
    ///
    pub fn from_env() -> CatalogConfigResult<Self> {
        CatalogConfig::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> CatalogConfigResult<Self> {
        if let Some(value) = env_batch_size() {
            self.batch_size =
                value.map_err(|raw| CatalogConfigError::InvalidValue("batch_size".into(), raw))?;
        }
        if let Some(value) = env_keep_tokens() {
            self.keep_tokens =
                value.map_err(|raw| CatalogConfigError::InvalidValue("keep_tokens".into(), raw))?;
        }
        if let Some(value) = env_vid_prefix() {
            self.vid_prefix =
                value.map_err(|raw| CatalogConfigError::InvalidValue("vid_prefix".into(), raw))?;
        }
        if let Some(path) = env_snapshot_path() {
            self.snapshot = Some(path);
        }
        self.validate()
    }

    fn validate(mut self) -> CatalogConfigResult<Self> {
        if self.batch_size == 0 {
            return Err(CatalogConfigError::InvalidValue(
                "batch_size".into(),
                "0".into(),
            ));
        }
        if self.max_selector_terms == 0 {
            return Err(CatalogConfigError::InvalidValue(
                "max_selector_terms".into(),
                "0".into(),
            ));
        }
        if !self.vid_prefix.is_ascii_alphabetic() {
            return Err(CatalogConfigError::InvalidValue(
                "vid_prefix".into(),
                self.vid_prefix.to_string(),
            ));
        }
        self.keep_tokens = self.keep_tokens.max(1);
        self.snapshot = self
            .snapshot
            .map(|p| expand_path(&p.to_string_lossy()));
        Ok(self)
    }

    /// Mint a VID with the configured prefix.
    pub fn mint_vid(&self) -> Vid {
        Vid::mint(self.vid_prefix)
    }
}

impl TryFrom<&Path> for CatalogConfig {
    type Error = CatalogConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let toml_str = read_to_string(path)?;
        let config: CatalogConfig = toml::from_str(&toml_str)?;
        config.validate()
    }
}
