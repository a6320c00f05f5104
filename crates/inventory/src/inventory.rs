use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use radiodesk_core::{Aggregate, DeskError, RadioId};

use crate::accessory::{AccessoryLoan, AccessoryPool, PoolKind};
use crate::command::DeskCommand;
use crate::engine::CheckoutEngine;
use crate::event::DeskEvent;
use crate::history::{HistoryIndex, NetTotals, SubjectField};
use crate::limits::DepartmentLimits;
use crate::radio::Radio;

/// Persisted document: everything except configuration-supplied totals and limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub radios: BTreeMap<RadioId, Radio>,
    /// Outstanding headset loans.
    #[serde(default)]
    pub headsets: Vec<AccessoryLoan>,
    #[serde(default)]
    pub headset_history: Vec<AccessoryLoan>,
    /// Outstanding battery loans.
    #[serde(default)]
    pub batteries: Vec<AccessoryLoan>,
    #[serde(default)]
    pub battery_history: Vec<AccessoryLoan>,
    #[serde(default)]
    pub audits: Vec<String>,
}

/// Authoritative desk state: radios, accessory pools, department limits, audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    radios: BTreeMap<RadioId, Radio>,
    headsets: AccessoryPool,
    batteries: AccessoryPool,
    limits: DepartmentLimits,
    audits: Vec<String>,
    version: u64,
}

impl Inventory {
    pub fn new(headset_capacity: u32, battery_capacity: u32, limits: DepartmentLimits) -> Self {
        Self::from_snapshot(InventorySnapshot::default(), headset_capacity, battery_capacity, limits)
    }

    pub fn from_snapshot(
        snapshot: InventorySnapshot,
        headset_capacity: u32,
        battery_capacity: u32,
        limits: DepartmentLimits,
    ) -> Self {
        Self {
            radios: snapshot.radios,
            headsets: AccessoryPool::restore(
                PoolKind::Headset,
                headset_capacity,
                snapshot.headsets,
                snapshot.headset_history,
            ),
            batteries: AccessoryPool::restore(
                PoolKind::Battery,
                battery_capacity,
                snapshot.batteries,
                snapshot.battery_history,
            ),
            limits,
            audits: snapshot.audits,
            version: 0,
        }
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            radios: self.radios.clone(),
            headsets: self.headsets.outstanding().to_vec(),
            headset_history: self.headsets.history().to_vec(),
            batteries: self.batteries.outstanding().to_vec(),
            battery_history: self.batteries.history().to_vec(),
            audits: self.audits.clone(),
        }
    }

    pub fn radio(&self, id: RadioId) -> Option<&Radio> {
        self.radios.get(&id)
    }

    pub fn radios(&self) -> impl Iterator<Item = (RadioId, &Radio)> + '_ {
        self.radios.iter().map(|(id, radio)| (*id, radio))
    }

    pub fn pool(&self, kind: PoolKind) -> &AccessoryPool {
        match kind {
            PoolKind::Headset => &self.headsets,
            PoolKind::Battery => &self.batteries,
        }
    }

    fn pool_mut(&mut self, kind: PoolKind) -> &mut AccessoryPool {
        match kind {
            PoolKind::Headset => &mut self.headsets,
            PoolKind::Battery => &mut self.batteries,
        }
    }

    pub fn headsets(&self) -> &AccessoryPool {
        &self.headsets
    }

    pub fn batteries(&self) -> &AccessoryPool {
        &self.batteries
    }

    pub fn limits(&self) -> &DepartmentLimits {
        &self.limits
    }

    pub fn audits(&self) -> &[String] {
        &self.audits
    }

    /// Outstanding accessories attributed to `department`, across every pool.
    ///
    /// Radio-bundled headsets are lent through the headset pool, so each
    /// headset is counted exactly once whichever path lent it. Radios
    /// themselves do not count towards the quota.
    pub fn department_total(&self, department: &str) -> usize {
        self.headsets.department_count(department) + self.batteries.department_count(department)
    }

    /// Net radios/headsets/batteries still held by `borrower`, per the history logs.
    pub fn outstanding_for(&self, borrower: &str) -> NetTotals {
        HistoryIndex::new(self)
            .history_for(borrower, SubjectField::Borrower)
            .net_totals()
    }

    /// Startup reconciliation: register a blank radio for a configured id the
    /// stored data does not know. Stored state wins for known ids.
    pub fn ensure_radio(&mut self, id: RadioId) -> bool {
        if self.radios.contains_key(&id) {
            return false;
        }
        self.radios.insert(id, Radio::blank());
        true
    }

    pub fn set_capacity(&mut self, kind: PoolKind, capacity: u32) {
        self.pool_mut(kind).set_capacity(capacity);
    }

    pub fn set_limits(&mut self, limits: DepartmentLimits) {
        self.limits = limits;
    }
}

impl Aggregate for Inventory {
    type Command = DeskCommand;
    type Event = DeskEvent;
    type Error = DeskError;

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DeskEvent::RadioCreated(e) => {
                self.radios.entry(e.radio_id).or_insert_with(Radio::blank);
            }
            DeskEvent::RadioCheckedOut(e) => {
                if let Some(radio) = self.radios.get_mut(&e.radio_id) {
                    radio.push_record(e.record.clone());
                }
            }
            DeskEvent::RadioReturned(e) => {
                if let Some(radio) = self.radios.get_mut(&e.radio_id) {
                    radio.push_record(e.record.clone());
                }
            }
            DeskEvent::AccessoryLent(e) => {
                self.pool_mut(e.pool).lend(e.loan.clone());
            }
            DeskEvent::AccessoryReturned(e) => {
                self.pool_mut(e.pool).take_back(&e.borrower, e.entry.clone());
            }
            DeskEvent::RadioLocked(e) => {
                if let Some(radio) = self.radios.get_mut(&e.radio_id) {
                    radio.set_locked(true, e.occurred_at);
                }
                let reason = e.reason.as_deref().unwrap_or("no reason given");
                self.audits
                    .push(format!("{} radio {} locked: {reason}", e.occurred_at.to_rfc3339(), e.radio_id));
            }
            DeskEvent::RadioUnlocked(e) => {
                if let Some(radio) = self.radios.get_mut(&e.radio_id) {
                    radio.set_locked(false, e.occurred_at);
                }
                self.audits
                    .push(format!("{} radio {} unlocked", e.occurred_at.to_rfc3339(), e.radio_id));
            }
            DeskEvent::OverrideWaived(e) => {
                self.audits
                    .push(format!("{} {}: {}", e.occurred_at.to_rfc3339(), e.token, e.context));
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let engine = CheckoutEngine::new(self);
        match command {
            DeskCommand::CreateRadio(cmd) => engine.create_radio(cmd),
            DeskCommand::CheckoutRadio(cmd) => engine.checkout(cmd),
            DeskCommand::ReturnRadio(cmd) => engine.return_radio(cmd),
            DeskCommand::LockRadio(cmd) => engine.lock(cmd),
            DeskCommand::UnlockRadio(cmd) => engine.unlock(cmd),
            DeskCommand::CheckoutAccessory(cmd) => {
                let total = cmd
                    .department
                    .as_deref()
                    .map(|d| self.department_total(d))
                    .unwrap_or(0);
                self.pool(cmd.pool).decide_checkout(cmd, total, &self.limits)
            }
            DeskCommand::ReturnAccessory(cmd) => self.pool(cmd.pool).decide_return(cmd),
        }
    }
}
