use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use super::vid::Vid;
use crate::consts::{DEFAULT_VID_PREFIX, MAX_CHROM_CODE};
use crate::errors::{VcsError, VcsResult};

///
/// A versioned coordinate system. Every alignment and every variant call
/// support refers to exactly one reference genome; two genomes are the same
/// when their VIDs are.
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceGenome {
    pub vid: Vid,
    pub label: String,
    pub n_chroms: u8,
    pub maker: String,
    pub model: String,
    pub release: String,
}

impl ReferenceGenome {
    pub fn new(label: &str, n_chroms: u8, maker: &str, model: &str, release: &str) -> VcsResult<Self> {
        if n_chroms == 0 || n_chroms > MAX_CHROM_CODE {
            return Err(VcsError::Usage(format!(
                "Reference genome {} declares {} chromosomes",
                label, n_chroms
            )));
        }
        Ok(ReferenceGenome {
            vid: Vid::mint(DEFAULT_VID_PREFIX),
            label: label.to_string(),
            n_chroms,
            maker: maker.to_string(),
            model: model.to_string(),
            release: release.to_string(),
        })
    }

    /// Whether `chrom` is a real chromosome of this genome.
    pub fn has_chromosome(&self, chrom: u8) -> bool {
        chrom >= 1 && chrom <= self.n_chroms
    }
}

impl Display for ReferenceGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{}/{})",
            self.label, self.maker, self.model, self.release
        )
    }
}
