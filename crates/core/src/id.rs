//! Strongly-typed identifiers used across the desk.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DeskError;

/// Identifier of a radio.
///
/// Always a positive integer; serialized in its canonical decimal form so
/// `"05"` and `"5"` name the same radio.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RadioId(u32);

impl RadioId {
    pub fn new(value: u32) -> Result<Self, DeskError> {
        if value == 0 {
            return Err(DeskError::invalid_id("radio id must be positive"));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for RadioId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RadioId {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = trimmed
            .parse::<u32>()
            .map_err(|e| DeskError::invalid_id(format!("{trimmed:?}: {e}")))?;
        Self::new(value)
    }
}

impl TryFrom<String> for RadioId {
    type Error = DeskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RadioId> for String {
    fn from(value: RadioId) -> Self {
        value.to_string()
    }
}
