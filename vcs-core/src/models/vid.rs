use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use uuid::Uuid;

use crate::consts::{DEFAULT_VID_PREFIX, VID_LENGTH, VID_VERSION_DIGIT};
use crate::errors::{VcsError, VcsResult};

///
/// Minted identifier of every catalog object: one letter prefix, one digit
/// and 32 uppercase hexadecimal characters taken from a fresh UUID.
///
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vid(String);

impl Vid {
    ///
    /// Mint a fresh VID with the given prefix letter.
    ///
    pub fn mint(prefix: char) -> Self {
        let hex = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Vid(format!("{}{}{}", prefix, VID_VERSION_DIGIT, hex))
    }

    ///
    /// Validate and wrap an existing VID string.
    ///
    pub fn parse(value: &str) -> VcsResult<Self> {
        let bytes = value.as_bytes();
        let well_formed = bytes.len() == VID_LENGTH
            && bytes[0].is_ascii_alphabetic()
            && bytes[1].is_ascii_digit()
            && bytes[2..]
                .iter()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(b));
        if !well_formed {
            return Err(VcsError::Usage(format!("Not a valid VID: {:?}", value)));
        }
        Ok(Vid(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> char {
        self.0.chars().next().unwrap_or(DEFAULT_VID_PREFIX)
    }
}

impl Default for Vid {
    fn default() -> Self {
        Vid::mint(DEFAULT_VID_PREFIX)
    }
}

impl FromStr for Vid {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vid::parse(s)
    }
}

impl AsRef<str> for Vid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Vid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_mint_shape() {
        let vid = Vid::mint('V');
        assert_eq!(vid.as_str().len(), VID_LENGTH);
        assert_eq!(vid.prefix(), 'V');
        assert!(Vid::parse(vid.as_str()).is_ok());
    }

    #[rstest]
    fn test_mint_is_fresh() {
        assert_ne!(Vid::mint('V'), Vid::mint('V'));
    }

    #[rstest]
    #[case("")]
    #[case("V0")]
    #[case("V0abcdefabcdefabcdefabcdefabcdefab")]
    #[case("0V00000000000000000000000000000000")]
    fn test_parse_rejects(#[case] value: &str) {
        assert!(Vid::parse(value).is_err());
    }
}
