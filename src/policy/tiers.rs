//! Confidentiality tiers and caller access levels
//!
//! Tiers classify stored content; access levels classify callers. The two
//! meet in exactly one place: [`Tier::min_access_level`]. Every gate in the
//! engine goes through that table, so tightening a tier is a one-line change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// Confidentiality classification of stored content, least to most sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Public,
    Internal,
    Confidential,
    Restricted,
    Secret,
}

impl Tier {
    /// All tiers in ascending sensitivity order.
    pub const ALL: [Tier; 5] = [
        Tier::Public,
        Tier::Internal,
        Tier::Confidential,
        Tier::Restricted,
        Tier::Secret,
    ];

    /// Minimum caller level required to read content at this tier.
    ///
    /// Restricted and Secret intentionally share the top level; they differ
    /// in topic handling, not in clearance.
    pub fn min_access_level(&self) -> AccessLevel {
        match self {
            Tier::Public => AccessLevel::MIN,
            Tier::Internal => AccessLevel(1),
            Tier::Confidential => AccessLevel(2),
            Tier::Restricted => AccessLevel::MAX,
            Tier::Secret => AccessLevel::MAX,
        }
    }

    /// Canonical lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Public => "public",
            Tier::Internal => "internal",
            Tier::Confidential => "confidential",
            Tier::Restricted => "restricted",
            Tier::Secret => "secret",
        }
    }

    /// Single-letter code used in curator-facing document tags.
    pub fn code(&self) -> &'static str {
        match self {
            Tier::Public => "P",
            Tier::Internal => "I",
            Tier::Confidential => "C",
            Tier::Restricted => "R",
            Tier::Secret => "S",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tier {
    type Err = EngineError;

    /// Accepts full names and single-letter codes, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" | "p" => Ok(Tier::Public),
            "internal" | "i" => Ok(Tier::Internal),
            "confidential" | "c" => Ok(Tier::Confidential),
            "restricted" | "r" => Ok(Tier::Restricted),
            "secret" | "s" => Ok(Tier::Secret),
            other => Err(EngineError::UnknownTier(other.to_string())),
        }
    }
}

/// Validated caller clearance, 0 (anonymous) through 3 (supreme).
///
/// Construction is the only place range is checked; once a value exists it
/// is known good everywhere downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AccessLevel(u8);

impl AccessLevel {
    /// Anonymous caller.
    pub const MIN: AccessLevel = AccessLevel(0);
    /// Supreme clearance.
    pub const MAX: AccessLevel = AccessLevel(3);

    /// Builds a level, rejecting values outside 0..=3.
    pub fn new(value: u8) -> crate::errors::Result<Self> {
        if value > Self::MAX.0 {
            return Err(EngineError::InvalidAccessLevel { value });
        }
        Ok(AccessLevel(value))
    }

    /// Raw numeric level.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for AccessLevel {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        AccessLevel::new(value)
    }
}

impl From<AccessLevel> for u8 {
    fn from(level: AccessLevel) -> u8 {
        level.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering_matches_sensitivity() {
        for pair in Tier::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].min_access_level() <= pair[1].min_access_level());
        }
    }

    #[test]
    fn test_min_access_level_table() {
        assert_eq!(Tier::Public.min_access_level().value(), 0);
        assert_eq!(Tier::Internal.min_access_level().value(), 1);
        assert_eq!(Tier::Confidential.min_access_level().value(), 2);
        assert_eq!(Tier::Restricted.min_access_level().value(), 3);
        assert_eq!(Tier::Secret.min_access_level().value(), 3);
    }

    #[test]
    fn test_tier_parse_codes_and_names() {
        assert_eq!("S".parse::<Tier>().unwrap(), Tier::Secret);
        assert_eq!("confidential".parse::<Tier>().unwrap(), Tier::Confidential);
        assert_eq!(" Restricted ".parse::<Tier>().unwrap(), Tier::Restricted);
        assert!("ultra".parse::<Tier>().is_err());
    }

    #[test]
    fn test_tier_roundtrip_display_parse() {
        for tier in Tier::ALL {
            assert_eq!(tier.as_str().parse::<Tier>().unwrap(), tier);
            assert_eq!(tier.code().parse::<Tier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_access_level_range() {
        assert!(AccessLevel::new(0).is_ok());
        assert!(AccessLevel::new(3).is_ok());
        assert!(matches!(
            AccessLevel::new(4),
            Err(EngineError::InvalidAccessLevel { value: 4 })
        ));
    }

    #[test]
    fn test_access_level_serde_rejects_out_of_range() {
        let ok: AccessLevel = serde_json::from_str("2").unwrap();
        assert_eq!(ok.value(), 2);
        assert!(serde_json::from_str::<AccessLevel>("9").is_err());
    }
}
