//! Override tokens: supervised waivers for individual borrowing rules.
//!
//! Each waivable [`ViolationKind`](crate::ViolationKind) maps to exactly one
//! token. Callers pass an [`OverrideSet`] with every operation; a check whose
//! token is present is skipped and reported back as a waiver instead of an error.

use std::collections::BTreeSet;

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{DeskError, PolicyViolation};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideToken {
    AllowLockedCheckout,
    AllowDoubleCheckout,
    AllowDoubleReturn,
    AllowWrongPerson,
    AllowNegativeCount,
    AllowDepartmentOverdraft,
    AllowMissingHeadset,
    AllowExtraHeadset,
}

impl OverrideToken {
    pub const ALL: [OverrideToken; 8] = [
        OverrideToken::AllowLockedCheckout,
        OverrideToken::AllowDoubleCheckout,
        OverrideToken::AllowDoubleReturn,
        OverrideToken::AllowWrongPerson,
        OverrideToken::AllowNegativeCount,
        OverrideToken::AllowDepartmentOverdraft,
        OverrideToken::AllowMissingHeadset,
        OverrideToken::AllowExtraHeadset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllowLockedCheckout => "ALLOW_LOCKED_CHECKOUT",
            Self::AllowDoubleCheckout => "ALLOW_DOUBLE_CHECKOUT",
            Self::AllowDoubleReturn => "ALLOW_DOUBLE_RETURN",
            Self::AllowWrongPerson => "ALLOW_WRONG_PERSON",
            Self::AllowNegativeCount => "ALLOW_NEGATIVE_COUNT",
            Self::AllowDepartmentOverdraft => "ALLOW_DEPARTMENT_OVERDRAFT",
            Self::AllowMissingHeadset => "ALLOW_MISSING_HEADSET",
            Self::AllowExtraHeadset => "ALLOW_EXTRA_HEADSET",
        }
    }
}

impl core::fmt::Display for OverrideToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token name that is not part of the closed override set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown override token: {0}")]
pub struct UnknownOverrideToken(pub String);

impl FromStr for OverrideToken {
    type Err = UnknownOverrideToken;

    /// Accepts both `ALLOW_DOUBLE_CHECKOUT` and `allow-double-checkout`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownOverrideToken(s.to_string()))
    }
}

/// Set of tokens supplied with one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideSet(BTreeSet<OverrideToken>);

impl OverrideSet {
    pub fn none() -> Self {
        Self::default()
    }

    /// Overrides a desk applies to every return unless told otherwise: the
    /// headset bookkeeping checks and the borrower-identity check.
    pub fn return_defaults() -> Self {
        [
            OverrideToken::AllowMissingHeadset,
            OverrideToken::AllowExtraHeadset,
            OverrideToken::AllowWrongPerson,
        ]
        .into_iter()
        .collect()
    }

    /// A walk-up return (radio dropped on the desk) also tolerates radios the
    /// store already believes are checked in.
    pub fn walk_up_return() -> Self {
        Self::return_defaults().with(OverrideToken::AllowDoubleReturn)
    }

    pub fn with(mut self, token: OverrideToken) -> Self {
        self.0.insert(token);
        self
    }

    pub fn insert(&mut self, token: OverrideToken) -> bool {
        self.0.insert(token)
    }

    pub fn contains(&self, token: OverrideToken) -> bool {
        self.0.contains(&token)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = OverrideToken> + '_ {
        self.0.iter().copied()
    }

    /// Resolve a failed check: waived when its token is present, surfaced otherwise.
    pub fn waive(&self, violation: PolicyViolation) -> Result<OverrideToken, DeskError> {
        match violation.override_token() {
            Some(token) if self.contains(token) => Ok(token),
            _ => Err(DeskError::Policy(violation)),
        }
    }
}

impl FromIterator<OverrideToken> for OverrideSet {
    fn from_iter<I: IntoIterator<Item = OverrideToken>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
