//! Difficulty patterns
//!
//! A difficulty is the literal prefix a qualifying hex fingerprint must start
//! with, e.g. `"0000"`. Patterns are validated up front so a search can never
//! be started against something no hex digest could match.

use crate::digest::FINGERPRINT_HEX_LEN;
use crate::errors::MiningError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validated leading pattern for proof-of-work
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DifficultyPattern(String);

impl DifficultyPattern {
    /// Parse a pattern; only lowercase hex digits, at most 64 of them
    pub fn new(pattern: impl Into<String>) -> Result<Self, MiningError> {
        let pattern = pattern.into();
        if pattern.len() > FINGERPRINT_HEX_LEN {
            return Err(MiningError::MalformedPattern {
                pattern,
                reason: "longer than a fingerprint",
            });
        }
        if !pattern
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(MiningError::MalformedPattern {
                pattern,
                reason: "only lowercase hex digits can appear in a fingerprint",
            });
        }
        Ok(Self(pattern))
    }

    /// `n` leading zeros, capped at the fingerprint length
    pub fn leading_zeros(n: usize) -> Self {
        Self("0".repeat(n.min(FINGERPRINT_HEX_LEN)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Every fingerprint matches the empty pattern
    pub fn is_trivial(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_met_by(&self, fingerprint: &str) -> bool {
        fingerprint.starts_with(&self.0)
    }

    /// Expected number of digests per solution, 16^len (saturating)
    pub fn expected_attempts(&self) -> u64 {
        16u64.checked_pow(self.0.len() as u32).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for DifficultyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DifficultyPattern {
    type Err = MiningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DifficultyPattern {
    type Error = MiningError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DifficultyPattern> for String {
    fn from(value: DifficultyPattern) -> Self {
        value.0
    }
}
