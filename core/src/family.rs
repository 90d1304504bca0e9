//! Instruction-set family identifiers.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of a target architecture variant whose encoding a decoder
/// understands (e.g. `AMDGPU`).
///
/// Names are case-sensitive and must match a family the linked
/// toolkit actually ships.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Family(Cow<'static, str>);

impl Family {
    /// AMD GCN / RDNA GPUs.
    pub const AMDGPU: Family = Family(Cow::Borrowed("AMDGPU"));

    /// Build a family from a name known at compile time.
    ///
    /// The name is not validated; use `parse` for configuration input.
    pub const fn from_static(name: &'static str) -> Self {
        Family(Cow::Borrowed(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FamilyParseError {
    #[error("instruction-set family name cannot be empty")]
    Empty,
    #[error("invalid character {ch:?} in instruction-set family name {name:?}")]
    InvalidChar { name: String, ch: char },
}

impl FromStr for Family {
    type Err = FamilyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(FamilyParseError::Empty);
        }
        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(FamilyParseError::InvalidChar {
                name: name.to_string(),
                ch,
            });
        }
        Ok(Family(Cow::Owned(name.to_string())))
    }
}

impl TryFrom<String> for Family {
    type Error = FamilyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Family> for String {
    fn from(family: Family) -> Self {
        family.0.into_owned()
    }
}
