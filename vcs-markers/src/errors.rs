use thiserror::Error;

use vcs_core::VcsError;

#[derive(Error, Debug, PartialEq)]
pub enum MaskError {
    #[error("Malformed mask {0:?}")]
    Malformed(String),
    #[error("Mask {0:?} has more than two alleles")]
    MultiAllelic(String),
    #[error("Cannot tell the strand of mask {0:?}")]
    Undecidable(String),
}

pub type MaskResult<T> = std::result::Result<T, MaskError>;

impl From<MaskError> for VcsError {
    fn from(value: MaskError) -> Self {
        VcsError::Usage(value.to_string())
    }
}
