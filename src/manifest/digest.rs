use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("digest '{0}' is not of the form <algorithm>:<hex>")]
    MissingSeparator(String),
    #[error("digest '{0}' has an empty algorithm")]
    EmptyAlgorithm(String),
    #[error("digest '{0}' has a malformed hash")]
    InvalidHash(String),
}

/// A content digest such as `sha256:e3b0c442...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The hash portion, used as the checksum value.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| DigestError::MissingSeparator(s.to_string()))?;

        if algorithm.is_empty() {
            return Err(DigestError::EmptyAlgorithm(s.to_string()));
        }

        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::InvalidHash(s.to_string()));
        }

        Ok(Digest {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sha256() {
        let digest: Digest =
            "sha256:a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3"
                .parse()
                .unwrap();
        assert_eq!(digest.algorithm(), "sha256");
        assert_eq!(
            digest.hex(),
            "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3"
        );
        assert_eq!(
            digest.to_string(),
            "sha256:a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3"
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "sha256".parse::<Digest>(),
            Err(DigestError::MissingSeparator(_))
        ));
        assert!(matches!(
            ":abcd".parse::<Digest>(),
            Err(DigestError::EmptyAlgorithm(_))
        ));
        assert!(matches!(
            "sha256:".parse::<Digest>(),
            Err(DigestError::InvalidHash(_))
        ));
        assert!(matches!(
            "sha256:xyz0".parse::<Digest>(),
            Err(DigestError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_only_first_separator_splits() {
        assert!(matches!(
            "sha256:ab:cd".parse::<Digest>(),
            Err(DigestError::InvalidHash(_))
        ));
        let short: Digest = "sha256:aaa".parse().unwrap();
        assert_eq!(short.hex(), "aaa");
    }
}
