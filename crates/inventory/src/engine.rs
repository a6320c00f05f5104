//! Radio lifecycle decisions.
//!
//! `CheckoutEngine` validates every precondition of a radio command against the
//! current [`Inventory`] and, only when all of them pass (or are waived),
//! returns the events describing the transition. It never mutates state.
//!
//! ```text
//! CHECKED_IN --checkout--> CHECKED_OUT --return--> CHECKED_IN
//! CHECKED_IN --lock--> LOCKED --unlock--> CHECKED_IN
//! ```

use chrono::{DateTime, Utc};
use radiodesk_core::{
    DeskError, DeskResult, OverrideToken, PolicyViolation, RadioId, ViolationKind,
};

use crate::accessory::{AccessoryLoan, PoolKind};
use crate::command::{CheckoutRadio, CreateRadio, LockRadio, ReturnRadio, UnlockRadio};
use crate::event::{
    AccessoryLent, AccessoryReturned, DeskEvent, RadioCheckedOut, RadioCreated, RadioLockChanged,
    RadioReturned,
};
use crate::inventory::Inventory;
use crate::radio::{CheckoutRecord, LoanStatus, Radio, RadioStatus};

#[derive(Debug, Clone, Copy)]
pub struct CheckoutEngine<'a> {
    inventory: &'a Inventory,
}

impl<'a> CheckoutEngine<'a> {
    pub fn new(inventory: &'a Inventory) -> Self {
        Self { inventory }
    }

    fn radio(&self, id: RadioId) -> DeskResult<&'a Radio> {
        self.inventory.radio(id).ok_or(DeskError::RadioNotFound(id))
    }

    pub fn create_radio(&self, cmd: &CreateRadio) -> DeskResult<Vec<DeskEvent>> {
        let radio_id: RadioId = cmd.raw_id.parse()?;
        if self.inventory.radio(radio_id).is_some() {
            return Err(DeskError::RadioExists(radio_id));
        }
        Ok(vec![DeskEvent::RadioCreated(RadioCreated {
            radio_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    pub fn checkout(&self, cmd: &CheckoutRadio) -> DeskResult<Vec<DeskEvent>> {
        let id = cmd.radio_id;
        let radio = self.radio(id)?;
        let mut waivers: Vec<(OverrideToken, String)> = Vec::new();

        if radio.status() == RadioStatus::Locked {
            let token = cmd.overrides.waive(PolicyViolation::new(
                ViolationKind::RadioLocked,
                format!("Radio {id} is locked"),
            ))?;
            waivers.push((token, format!("radio {id} checked out while locked")));
        }

        if radio.status() == RadioStatus::CheckedOut {
            let token = cmd.overrides.waive(PolicyViolation::new(
                ViolationKind::RadioUnavailable,
                "Already checked out",
            ))?;
            waivers.push((token, format!("radio {id} checked out twice")));
        }

        if let Some(dept) = cmd.department.as_deref() {
            let total = self.inventory.department_total(dept);
            if let Some(token) = self
                .inventory
                .limits()
                .check(Some(dept), total, &cmd.overrides)?
            {
                waivers.push((token, format!("radio {id} checked out over {dept} limit")));
            }
        }

        if cmd.wants_headset {
            if let Some(token) = self
                .inventory
                .pool(PoolKind::Headset)
                .check_capacity(&cmd.overrides)?
            {
                waivers.push((token, format!("headset bundled with radio {id} beyond capacity")));
            }
        }

        let stamp = self.stamp(radio, cmd.wants_headset, cmd.occurred_at);
        let mut events: Vec<DeskEvent> = waivers
            .into_iter()
            .map(|(token, context)| DeskEvent::waived(token, context, stamp))
            .collect();

        events.push(DeskEvent::RadioCheckedOut(RadioCheckedOut {
            radio_id: id,
            record: CheckoutRecord {
                status: LoanStatus::CheckedOut,
                time: stamp,
                borrower: Some(cmd.borrower.clone()),
                department: cmd.department.clone(),
                badge: cmd.badge.clone(),
                barcode: cmd.barcode.clone(),
                headset: Some(cmd.wants_headset),
            },
        }));

        if cmd.wants_headset {
            events.push(DeskEvent::AccessoryLent(AccessoryLent {
                pool: PoolKind::Headset,
                loan: AccessoryLoan {
                    department: cmd.department.clone(),
                    borrower: cmd.borrower.clone(),
                    badge: cmd.badge.clone(),
                    barcode: cmd.barcode.clone(),
                    time: stamp,
                    status: LoanStatus::CheckedOut,
                },
            }));
        }

        Ok(events)
    }

    pub fn return_radio(&self, cmd: &ReturnRadio) -> DeskResult<Vec<DeskEvent>> {
        let id = cmd.radio_id;
        let radio = self.radio(id)?;
        let vacated = radio.checkout();
        let mut waivers: Vec<(OverrideToken, String)> = Vec::new();

        // LOCKED is only left through unlock.
        if radio.status() == RadioStatus::Locked {
            return Err(DeskError::invalid_transition(format!(
                "radio {id} is locked and cannot be returned"
            )));
        }

        if radio.status() != RadioStatus::CheckedOut {
            let token = cmd.overrides.waive(PolicyViolation::new(
                ViolationKind::NotCheckedOut,
                "Radio was already checked in",
            ))?;
            waivers.push((token, format!("radio {id} returned while not checked out")));

            // The vacated record is a previous return; its borrower holds nothing
            // bundled with this radio.
            if cmd.returning_headset {
                return Err(PolicyViolation::new(
                    ViolationKind::UnexpectedHeadset,
                    "Radio is not checked out; return the headset on its own",
                )
                .not_waivable()
                .into());
            }
        }

        if vacated.had_headset() && !cmd.returning_headset {
            let token = cmd.overrides.waive(PolicyViolation::new(
                ViolationKind::HeadsetRequired,
                "Radio was checked out with headset",
            ))?;
            waivers.push((token, format!("radio {id} returned without its headset")));
        }

        if cmd.returning_headset && !vacated.had_headset() {
            let token = cmd.overrides.waive(PolicyViolation::new(
                ViolationKind::UnexpectedHeadset,
                "Radio was not checked out with headset",
            ))?;
            waivers.push((token, format!("radio {id} returned with an extra headset")));
        }

        if cmd.borrower.as_deref() != vacated.borrower.as_deref() {
            let holder = vacated.borrower.as_deref().unwrap_or("nobody");
            let token = cmd.overrides.waive(PolicyViolation::new(
                ViolationKind::WrongPerson,
                format!("Radio was checked out by '{holder}'"),
            ))?;
            let returner = cmd.borrower.as_deref().unwrap_or("an unnamed person");
            waivers.push((token, format!("radio {id} held by {holder} returned by {returner}")));
        }

        let stamp = self.stamp(radio, cmd.returning_headset, cmd.occurred_at);

        let headset_return = if cmd.returning_headset {
            let holder = vacated.borrower.clone().ok_or_else(|| {
                PolicyViolation::new(
                    ViolationKind::NoOutstandingLoan,
                    format!("No headset loan found to check in for radio {id}"),
                )
            })?;
            if self.inventory.pool(PoolKind::Headset).find_loan(&holder).is_none() {
                return Err(PolicyViolation::new(
                    ViolationKind::NoOutstandingLoan,
                    format!("No headset loan found to check in for {holder}"),
                )
                .into());
            }
            Some(AccessoryReturned {
                pool: PoolKind::Headset,
                borrower: holder.clone(),
                entry: AccessoryLoan {
                    department: vacated.department.clone(),
                    borrower: holder,
                    badge: vacated.badge.clone(),
                    barcode: cmd.barcode.clone().or_else(|| vacated.barcode.clone()),
                    time: stamp,
                    status: LoanStatus::CheckedIn,
                },
            })
        } else {
            None
        };

        let mut events: Vec<DeskEvent> = waivers
            .into_iter()
            .map(|(token, context)| DeskEvent::waived(token, context, stamp))
            .collect();

        events.push(DeskEvent::RadioReturned(RadioReturned {
            radio_id: id,
            record: CheckoutRecord {
                status: LoanStatus::CheckedIn,
                time: stamp,
                borrower: cmd.borrower.clone().or_else(|| vacated.borrower.clone()),
                department: cmd.department.clone().or_else(|| vacated.department.clone()),
                badge: cmd.badge.clone().or_else(|| vacated.badge.clone()),
                barcode: cmd.barcode.clone().or_else(|| vacated.barcode.clone()),
                headset: None,
            },
        }));

        if let Some(returned) = headset_return {
            events.push(DeskEvent::AccessoryReturned(returned));
        }

        Ok(events)
    }

    /// Stamp for a radio transition, also clamped against the headset log when
    /// a headset moves with the radio.
    fn stamp(&self, radio: &Radio, with_headset: bool, occurred_at: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = radio.next_stamp(occurred_at);
        if with_headset {
            self.inventory.pool(PoolKind::Headset).next_stamp(stamp)
        } else {
            stamp
        }
    }

    /// Take a checked-in radio out of circulation.
    pub fn lock(&self, cmd: &LockRadio) -> DeskResult<Vec<DeskEvent>> {
        let radio = self.radio(cmd.radio_id)?;
        if radio.status() != RadioStatus::CheckedIn {
            return Err(DeskError::invalid_transition(format!(
                "radio {} must be checked in to be locked",
                cmd.radio_id
            )));
        }
        Ok(vec![DeskEvent::RadioLocked(RadioLockChanged {
            radio_id: cmd.radio_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    pub fn unlock(&self, cmd: &UnlockRadio) -> DeskResult<Vec<DeskEvent>> {
        let radio = self.radio(cmd.radio_id)?;
        if radio.status() != RadioStatus::Locked {
            return Err(DeskError::invalid_transition(format!(
                "radio {} is not locked",
                cmd.radio_id
            )));
        }
        Ok(vec![DeskEvent::RadioUnlocked(RadioLockChanged {
            radio_id: cmd.radio_id,
            reason: None,
            occurred_at: cmd.occurred_at,
        })])
    }
}
