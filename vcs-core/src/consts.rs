//! Constants shared by every vcs crate.

/// Multiplier used to fold a chromosome code and a position into one number.
pub const GLOBAL_POS_FACTOR: u64 = 10_000_000_000;

/// Chromosome codes beyond the autosomes.
pub const CHROM_X: u8 = 23;
pub const CHROM_Y: u8 = 24;
pub const CHROM_XY: u8 = 25;
pub const CHROM_MT: u8 = 26;

/// Highest chromosome code understood by the coordinate encoding.
pub const MAX_CHROM_CODE: u8 = CHROM_MT;

/// Default one-letter prefix of freshly minted VIDs.
pub const DEFAULT_VID_PREFIX: char = 'V';

/// Digit following the prefix in every VID.
pub const VID_VERSION_DIGIT: char = '0';

/// Total length of a VID string.
pub const VID_LENGTH: usize = 34;

/// Name of the mandatory column of every field array.
pub const FIELD_INDEX_COLUMN: &str = "index";

/// Default projection threshold for probabilistic calls (strictest).
pub const DEFAULT_CALL_THRESHOLD: f32 = 1.0;
