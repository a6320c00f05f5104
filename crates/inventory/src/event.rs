use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use radiodesk_core::{Event, OverrideToken, RadioId};

use crate::accessory::{AccessoryLoan, PoolKind};
use crate::radio::CheckoutRecord;

/// Event: RadioCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioCreated {
    pub radio_id: RadioId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RadioCheckedOut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioCheckedOut {
    pub radio_id: RadioId,
    pub record: CheckoutRecord,
}

/// Event: RadioReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioReturned {
    pub radio_id: RadioId,
    pub record: CheckoutRecord,
}

/// Event: AccessoryLent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryLent {
    pub pool: PoolKind,
    pub loan: AccessoryLoan,
}

/// Event: AccessoryReturned.
///
/// `borrower` is the correlation key of the outstanding loan being closed;
/// `entry` is the CHECKED_IN history entry, carrying the returning caller's
/// department/badge/barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryReturned {
    pub pool: PoolKind,
    pub borrower: String,
    pub entry: AccessoryLoan,
}

/// Event: RadioLocked / RadioUnlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioLockChanged {
    pub radio_id: RadioId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OverrideWaived (a supervised waiver, kept in the audit trail).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideWaived {
    pub token: OverrideToken,
    pub context: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeskEvent {
    RadioCreated(RadioCreated),
    RadioCheckedOut(RadioCheckedOut),
    RadioReturned(RadioReturned),
    AccessoryLent(AccessoryLent),
    AccessoryReturned(AccessoryReturned),
    RadioLocked(RadioLockChanged),
    RadioUnlocked(RadioLockChanged),
    OverrideWaived(OverrideWaived),
}

impl DeskEvent {
    pub(crate) fn waived(token: OverrideToken, context: impl Into<String>, at: DateTime<Utc>) -> Self {
        DeskEvent::OverrideWaived(OverrideWaived {
            token,
            context: context.into(),
            occurred_at: at,
        })
    }
}

impl Event for DeskEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeskEvent::RadioCreated(_) => "desk.radio.created",
            DeskEvent::RadioCheckedOut(_) => "desk.radio.checked_out",
            DeskEvent::RadioReturned(_) => "desk.radio.returned",
            DeskEvent::AccessoryLent(_) => "desk.accessory.lent",
            DeskEvent::AccessoryReturned(_) => "desk.accessory.returned",
            DeskEvent::RadioLocked(_) => "desk.radio.locked",
            DeskEvent::RadioUnlocked(_) => "desk.radio.unlocked",
            DeskEvent::OverrideWaived(_) => "desk.override.waived",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DeskEvent::RadioCreated(e) => e.occurred_at,
            DeskEvent::RadioCheckedOut(e) => e.record.time,
            DeskEvent::RadioReturned(e) => e.record.time,
            DeskEvent::AccessoryLent(e) => e.loan.time,
            DeskEvent::AccessoryReturned(e) => e.entry.time,
            DeskEvent::RadioLocked(e) | DeskEvent::RadioUnlocked(e) => e.occurred_at,
            DeskEvent::OverrideWaived(e) => e.occurred_at,
        }
    }
}
