//! Creature family keys.
//!
//! Family keys are stable string identifiers used in catalog data and player
//! saves (e.g., `fairy_cat`). They are ordered and validated to support
//! deterministic iteration and stable persistence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum accepted key length.
const MAX_KEY_LEN: usize = 64;

/// Error returned when parsing an invalid [`FamilyId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyIdError {
    message: String,
}

impl FamilyIdError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for FamilyIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FamilyIdError {}

/// Identifier of a creature family (lineage), e.g. `fairy_cat`.
///
/// Ordering is lexical and stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FamilyId(String);

impl FamilyId {
    /// Parse and validate a family key.
    pub fn parse(input: &str) -> Result<Self, FamilyIdError> {
        let input = input.trim();
        validate_key(input)?;
        Ok(Self(input.to_string()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FamilyId {
    type Err = FamilyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FamilyId {
    type Error = FamilyIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FamilyId> for String {
    fn from(value: FamilyId) -> Self {
        value.0
    }
}

fn validate_key(key: &str) -> Result<(), FamilyIdError> {
    if key.is_empty() {
        return Err(FamilyIdError::new("FamilyId cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(FamilyIdError::new("FamilyId too long (max 64)"));
    }
    if !key
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
    {
        return Err(FamilyIdError::new(
            "FamilyId has invalid characters (allowed: a-z0-9_)",
        ));
    }
    Ok(())
}
