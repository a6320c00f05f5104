use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use radiodesk_core::{OverrideSet, RadioId};

use crate::accessory::PoolKind;

/// Command: CreateRadio.
///
/// `raw_id` is validated by the decision (must be a positive integer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRadio {
    pub raw_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CheckoutRadio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRadio {
    pub radio_id: RadioId,
    pub department: Option<String>,
    pub borrower: String,
    pub badge: Option<String>,
    pub barcode: Option<String>,
    pub wants_headset: bool,
    pub overrides: OverrideSet,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnRadio.
///
/// `department`, `badge` and `barcode` fall back to the vacated checkout when
/// not supplied; `borrower` does too, after the identity check.
///
/// `overrides` defaults to [`OverrideSet::return_defaults`]; a caller that
/// wants the identity and headset checks enforced passes an explicit set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRadio {
    pub radio_id: RadioId,
    pub returning_headset: bool,
    pub borrower: Option<String>,
    pub department: Option<String>,
    pub badge: Option<String>,
    pub barcode: Option<String>,
    #[serde(default = "OverrideSet::return_defaults")]
    pub overrides: OverrideSet,
    pub occurred_at: DateTime<Utc>,
}

impl ReturnRadio {
    /// A desk return with the default waivers and nothing but the radio supplied.
    pub fn new(radio_id: RadioId, returning_headset: bool, occurred_at: DateTime<Utc>) -> Self {
        Self {
            radio_id,
            returning_headset,
            borrower: None,
            department: None,
            badge: None,
            barcode: None,
            overrides: OverrideSet::return_defaults(),
            occurred_at,
        }
    }

    pub fn by(mut self, borrower: impl Into<String>) -> Self {
        self.borrower = Some(borrower.into());
        self
    }

    pub fn with_overrides(mut self, overrides: OverrideSet) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Command: CheckoutAccessory (standalone headset or battery loan).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutAccessory {
    pub pool: PoolKind,
    pub department: Option<String>,
    pub borrower: String,
    pub badge: Option<String>,
    pub barcode: Option<String>,
    pub overrides: OverrideSet,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnAccessory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnAccessory {
    pub pool: PoolKind,
    pub borrower: String,
    pub department: Option<String>,
    pub badge: Option<String>,
    pub barcode: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: LockRadio (administrative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRadio {
    pub radio_id: RadioId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UnlockRadio (administrative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRadio {
    pub radio_id: RadioId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeskCommand {
    CreateRadio(CreateRadio),
    CheckoutRadio(CheckoutRadio),
    ReturnRadio(ReturnRadio),
    CheckoutAccessory(CheckoutAccessory),
    ReturnAccessory(ReturnAccessory),
    LockRadio(LockRadio),
    UnlockRadio(UnlockRadio),
}
