//! Holder identity type with `tdl_` prefix.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an account holder on a single chain, always prefixed with `tdl_`.
///
/// The same string may name holders on several chains; each chain keeps its
/// own independent account for it.
/// Deserialization goes through [`HolderId::parse`], so decoded ids are always
/// well-formed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct HolderId(String);

impl HolderId {
    /// The standard prefix for all holder identities.
    pub const PREFIX: &'static str = "tdl_";

    /// Create a holder id from a raw string.
    ///
    /// # Panics
    /// Panics if the string does not start with `tdl_`.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(s.starts_with(Self::PREFIX), "holder id must start with tdl_");
        Self(s)
    }

    /// Parse a holder id, rejecting malformed input instead of panicking.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let id = Self(raw.to_string());
        if id.is_valid() {
            Ok(id)
        } else {
            Err(TypesError::InvalidHolder(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Well-formed: prefixed, non-empty suffix, no whitespace.
    pub fn is_valid(&self) -> bool {
        self.0.starts_with(Self::PREFIX)
            && self.0.len() > Self::PREFIX.len()
            && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for HolderId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_prefixed_ids() {
        let id = HolderId::parse("tdl_alice").unwrap();
        assert_eq!(id.as_str(), "tdl_alice");
        assert_eq!(id, HolderId::new("tdl_alice"));
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert!(HolderId::parse("alice").is_err());
        assert!(HolderId::parse("tdl_").is_err());
        assert!(HolderId::parse("tdl_al ice").is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<HolderId, _> = bincode::deserialize(&bincode::serialize("tdl_bob").unwrap());
        assert_eq!(ok.unwrap(), HolderId::new("tdl_bob"));
        let bad: Result<HolderId, _> = bincode::deserialize(&bincode::serialize("bob").unwrap());
        assert!(bad.is_err());
    }

    #[test]
    #[should_panic(expected = "must start with tdl_")]
    fn new_panics_without_prefix() {
        HolderId::new("bob");
    }
}
