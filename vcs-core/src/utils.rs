use crate::consts::{CHROM_MT, CHROM_X, CHROM_XY, CHROM_Y, GLOBAL_POS_FACTOR, MAX_CHROM_CODE};
use crate::errors::{VcsError, VcsResult};

///
/// Parse a chromosome name into its numeric code.
///
/// Accepts `1`-`22`, `X`, `Y`, `XY`, `MT` (or `M`), with or without a
/// leading `chr`, case-insensitively. Numeric strings up to 26 are taken
/// verbatim so that already encoded chromosomes round-trip.
///
pub fn chromosome_code(name: &str) -> VcsResult<u8> {
    let upper = name.trim().to_ascii_uppercase();
    let bare = upper.strip_prefix("CHR").unwrap_or(&upper);
    let code = match bare {
        "X" => CHROM_X,
        "Y" => CHROM_Y,
        "XY" => CHROM_XY,
        "MT" | "M" => CHROM_MT,
        other => other
            .parse::<u8>()
            .map_err(|_| VcsError::Usage(format!("Unknown chromosome: {}", name)))?,
    };
    if code == 0 || code > MAX_CHROM_CODE {
        return Err(VcsError::Usage(format!(
            "Chromosome code out of range: {}",
            name
        )));
    }
    Ok(code)
}

///
/// Human readable name of a chromosome code.
///
pub fn chromosome_name(code: u8) -> String {
    match code {
        CHROM_X => "X".to_string(),
        CHROM_Y => "Y".to_string(),
        CHROM_XY => "XY".to_string(),
        CHROM_MT => "MT".to_string(),
        c => c.to_string(),
    }
}

/// `chromosome * 10^10 + pos`
pub fn global_pos(chrom: u8, pos: u32) -> u64 {
    chrom as u64 * GLOBAL_POS_FACTOR + pos as u64
}

/// Inverse of [global_pos].
pub fn split_global_pos(global: u64) -> VcsResult<(u8, u32)> {
    let chrom = global / GLOBAL_POS_FACTOR;
    let pos = global % GLOBAL_POS_FACTOR;
    if chrom > MAX_CHROM_CODE as u64 || pos > u32::MAX as u64 {
        return Err(VcsError::Usage(format!(
            "Not a valid global position: {}",
            global
        )));
    }
    Ok((chrom as u8, pos as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("1", 1)]
    #[case("chr22", 22)]
    #[case("X", 23)]
    #[case("chrY", 24)]
    #[case("xy", 25)]
    #[case("MT", 26)]
    #[case("chrM", 26)]
    fn test_chromosome_code(#[case] name: &str, #[case] expected: u8) {
        assert_eq!(chromosome_code(name).unwrap(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("27")]
    #[case("chrUn")]
    fn test_bad_chromosome_code(#[case] name: &str) {
        assert!(matches!(chromosome_code(name), Err(VcsError::Usage(_))));
    }

    #[rstest]
    fn test_chromosome_name_round_trip() {
        for code in 1..=MAX_CHROM_CODE {
            assert_eq!(chromosome_code(&chromosome_name(code)).unwrap(), code);
        }
    }

    #[rstest]
    fn test_global_pos() {
        assert_eq!(global_pos(23, 1234), 230_000_001_234);
        assert_eq!(split_global_pos(230_000_001_234).unwrap(), (23, 1234));
        assert_eq!(split_global_pos(0).unwrap(), (0, 0));
    }
}
