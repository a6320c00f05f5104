//! Desk error model.
//!
//! Two tiers:
//! - **structural** failures (unknown radio, malformed or duplicate id, an
//!   administrative transition from the wrong state) are caller or data errors
//!   and can never be waived;
//! - **policy** violations carry the [`OverrideToken`] a supervisor may supply
//!   to skip that one check on a retry.
//!
//! Persistence failures are surfaced separately and are fatal for the operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::RadioId;
use crate::overrides::OverrideToken;

/// Result type used across the desk.
pub type DeskResult<T> = Result<T, DeskError>;

/// Desk-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeskError {
    /// No radio is registered under the identifier.
    #[error("radio {0} does not exist")]
    RadioNotFound(RadioId),

    /// A radio identifier was not a positive integer.
    #[error("invalid radio id: {0}")]
    InvalidId(String),

    /// A radio with the identifier was already registered.
    #[error("radio {0} already exists")]
    RadioExists(RadioId),

    /// A transition the current state does not allow: lock/unlock from the
    /// wrong state, or returning a locked radio.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A borrowing rule rejected the operation.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// Writing or reading the inventory snapshot failed.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// The desk broke one of its own invariants; not the caller's fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeskError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Structural errors indicate a caller/data problem, never a policy decision.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::RadioNotFound(_)
                | Self::InvalidId(_)
                | Self::RadioExists(_)
                | Self::InvalidTransition(_)
        )
    }

    pub fn policy(&self) -> Option<&PolicyViolation> {
        match self {
            Self::Policy(violation) => Some(violation),
            _ => None,
        }
    }

    /// Token that would waive this failure on retry, if any.
    pub fn override_token(&self) -> Option<OverrideToken> {
        self.policy().and_then(PolicyViolation::override_token)
    }
}

/// Closed set of borrowing-policy failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    RadioLocked,
    RadioUnavailable,
    NotCheckedOut,
    WrongPerson,
    HeadsetRequired,
    UnexpectedHeadset,
    PoolExhausted,
    DepartmentOverLimit,
    /// No outstanding accessory loan matches the returning borrower.
    NoOutstandingLoan,
}

impl ViolationKind {
    /// The one token tied to this failure kind.
    pub fn override_token(self) -> Option<OverrideToken> {
        match self {
            Self::RadioLocked => Some(OverrideToken::AllowLockedCheckout),
            Self::RadioUnavailable => Some(OverrideToken::AllowDoubleCheckout),
            Self::NotCheckedOut => Some(OverrideToken::AllowDoubleReturn),
            Self::WrongPerson => Some(OverrideToken::AllowWrongPerson),
            Self::HeadsetRequired => Some(OverrideToken::AllowMissingHeadset),
            Self::UnexpectedHeadset => Some(OverrideToken::AllowExtraHeadset),
            Self::PoolExhausted => Some(OverrideToken::AllowNegativeCount),
            Self::DepartmentOverLimit => Some(OverrideToken::AllowDepartmentOverdraft),
            Self::NoOutstandingLoan => None,
        }
    }
}

/// A rejected policy check: kind, human-readable message and waiving token.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct PolicyViolation {
    kind: ViolationKind,
    message: String,
    override_token: Option<OverrideToken>,
}

impl PolicyViolation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            override_token: kind.override_token(),
        }
    }

    /// Same violation with no waiving token (e.g. battery pool exhaustion).
    pub fn not_waivable(mut self) -> Self {
        self.override_token = None;
        self
    }

    pub fn kind(&self) -> ViolationKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn override_token(&self) -> Option<OverrideToken> {
        self.override_token
    }
}
