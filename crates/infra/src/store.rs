//! Serialized access to the desk inventory.
//!
//! Every mutation runs under one write lock:
//!
//! ```text
//! Command
//!   ↓
//! 1. Decide events against current state (no mutation)
//!   ↓
//! 2. Apply events to a working copy
//!   ↓
//! 3. Save the working copy's snapshot
//!   ↓
//! 4. Swap the working copy in, log the events
//! ```
//!
//! A rejected command or a failed save leaves the in-memory state untouched,
//! so memory never runs ahead of disk. Queries take the read lock and never
//! observe a half-applied operation.

use std::sync::{RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};

use radiodesk_core::{Aggregate, DeskError, DeskResult, Event, RadioId};
use radiodesk_inventory::{
    AccessoryLoan, CheckoutAccessory, CheckoutRadio, CheckoutRecord, CreateRadio, DeskCommand,
    DeskEvent, HistoryEntry, HistoryIndex, Inventory, InventorySnapshot, LockRadio, NetTotals,
    Radio, RadioCheckedOut, RadioReturned, ReturnAccessory, ReturnRadio, SubjectField,
    UnlockRadio,
};

use crate::config::DeskConfig;
use crate::snapshot::SnapshotStore;

/// Result of a radio return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub radio_id: RadioId,
    /// The check-in record just appended.
    pub record: CheckoutRecord,
    /// What the returning borrower still holds afterwards.
    pub outstanding: NetTotals,
}

impl ReturnOutcome {
    pub fn headset_still_out(&self) -> bool {
        self.outstanding.headsets > 0
    }

    pub fn battery_still_out(&self) -> bool {
        self.outstanding.batteries > 0
    }
}

pub struct InventoryStore<S> {
    state: RwLock<Inventory>,
    snapshots: S,
}

impl<S: SnapshotStore> InventoryStore<S> {
    /// Load and reconcile against `config` without writing anything back.
    pub fn load(config: &DeskConfig, snapshots: S) -> DeskResult<Self> {
        let snapshot = snapshots.load()?.unwrap_or_default();
        let mut inventory = Inventory::from_snapshot(
            snapshot,
            config.headsets,
            config.batteries,
            config.limits(),
        );
        for id in config.radio_ids()? {
            if inventory.ensure_radio(id) {
                tracing::info!(radio_id = %id, "registered configured radio");
            }
        }

        Ok(Self {
            state: RwLock::new(inventory),
            snapshots,
        })
    }

    /// Startup: load, reconcile, then persist the reconciled snapshot.
    pub fn open(config: &DeskConfig, snapshots: S) -> DeskResult<Self> {
        let store = Self::load(config, snapshots)?;
        {
            let state = store.read_guard()?;
            store.snapshots.save(&state.snapshot())?;
            tracing::info!(
                radios = state.radios().count(),
                headsets = state.headsets().capacity(),
                batteries = state.batteries().capacity(),
                "inventory opened"
            );
        }
        Ok(store)
    }

    /// Run one command to completion and return the events it committed.
    pub fn execute(&self, command: DeskCommand) -> DeskResult<Vec<DeskEvent>> {
        self.transact(command, |_, events| Ok(events.to_vec()))
    }

    fn transact<R>(
        &self,
        command: DeskCommand,
        outcome: impl FnOnce(&Inventory, &[DeskEvent]) -> DeskResult<R>,
    ) -> DeskResult<R> {
        let mut state = self
            .state
            .write()
            .map_err(|_| DeskError::persistence("inventory lock poisoned"))?;

        // 1) Decide
        let events = state.handle(&command).inspect_err(|err| {
            tracing::info!(error = %err, command = ?command, "command rejected");
        })?;

        // 2) Apply to a working copy
        let mut next = state.clone();
        for event in &events {
            next.apply(event);
        }

        // 3) Persist
        if let Err(err) = self.snapshots.save(&next.snapshot()) {
            tracing::error!(error = %err, "failed to persist snapshot; change discarded");
            return Err(err.into());
        }
        tracing::debug!(version = next.version(), "snapshot saved");

        // 4) Commit
        *state = next;
        for event in &events {
            log_event(event);
        }
        outcome(&state, &events)
    }

    pub fn create_radio(&self, raw_id: &str, occurred_at: DateTime<Utc>) -> DeskResult<RadioId> {
        let command = DeskCommand::CreateRadio(CreateRadio {
            raw_id: raw_id.to_string(),
            occurred_at,
        });
        self.transact(command, |_, events| {
            events
                .iter()
                .find_map(|e| match e {
                    DeskEvent::RadioCreated(e) => Some(e.radio_id),
                    _ => None,
                })
                .ok_or_else(|| nothing_recorded("radio creation"))
        })
    }

    pub fn checkout_radio(&self, cmd: CheckoutRadio) -> DeskResult<CheckoutRecord> {
        self.transact(DeskCommand::CheckoutRadio(cmd), |_, events| {
            events
                .iter()
                .find_map(|e| match e {
                    DeskEvent::RadioCheckedOut(e) => Some(e.record.clone()),
                    _ => None,
                })
                .ok_or_else(|| nothing_recorded("radio checkout"))
        })
    }

    pub fn return_radio(&self, cmd: ReturnRadio) -> DeskResult<ReturnOutcome> {
        self.transact(DeskCommand::ReturnRadio(cmd), |state, events| {
            let (radio_id, record) = events
                .iter()
                .find_map(|e| match e {
                    DeskEvent::RadioReturned(e) => Some((e.radio_id, e.record.clone())),
                    _ => None,
                })
                .ok_or_else(|| nothing_recorded("radio return"))?;
            let outstanding = record
                .borrower
                .as_deref()
                .map(|b| state.outstanding_for(b))
                .unwrap_or_default();
            Ok(ReturnOutcome {
                radio_id,
                record,
                outstanding,
            })
        })
    }

    pub fn checkout_accessory(&self, cmd: CheckoutAccessory) -> DeskResult<AccessoryLoan> {
        self.transact(DeskCommand::CheckoutAccessory(cmd), |_, events| {
            events
                .iter()
                .find_map(|e| match e {
                    DeskEvent::AccessoryLent(e) => Some(e.loan.clone()),
                    _ => None,
                })
                .ok_or_else(|| nothing_recorded("accessory checkout"))
        })
    }

    /// Returns the check-in entry appended to the pool history.
    pub fn return_accessory(&self, cmd: ReturnAccessory) -> DeskResult<AccessoryLoan> {
        self.transact(DeskCommand::ReturnAccessory(cmd), |_, events| {
            events
                .iter()
                .find_map(|e| match e {
                    DeskEvent::AccessoryReturned(e) => Some(e.entry.clone()),
                    _ => None,
                })
                .ok_or_else(|| nothing_recorded("accessory return"))
        })
    }

    pub fn lock_radio(&self, cmd: LockRadio) -> DeskResult<()> {
        self.transact(DeskCommand::LockRadio(cmd), |_, _| Ok(()))
    }

    pub fn unlock_radio(&self, cmd: UnlockRadio) -> DeskResult<()> {
        self.transact(DeskCommand::UnlockRadio(cmd), |_, _| Ok(()))
    }

    fn read_guard(&self) -> DeskResult<RwLockReadGuard<'_, Inventory>> {
        self.state
            .read()
            .map_err(|_| DeskError::persistence("inventory lock poisoned"))
    }

    /// Run a query against a consistent view of the inventory.
    pub fn read<R>(&self, f: impl FnOnce(&Inventory) -> R) -> DeskResult<R> {
        let state = self.read_guard()?;
        Ok(f(&state))
    }

    pub fn radio(&self, id: RadioId) -> DeskResult<Radio> {
        self.read(|inv| inv.radio(id).cloned())?
            .ok_or(DeskError::RadioNotFound(id))
    }

    pub fn department_total(&self, department: &str) -> DeskResult<usize> {
        self.read(|inv| inv.department_total(department))
    }

    pub fn outstanding_for(&self, borrower: &str) -> DeskResult<NetTotals> {
        self.read(|inv| inv.outstanding_for(borrower))
    }

    /// Chronological activity of a borrower or department across radios and pools.
    pub fn history_for(&self, subject: &str, by: SubjectField) -> DeskResult<Vec<HistoryEntry>> {
        self.read(|inv| HistoryIndex::new(inv).history_for(subject, by).to_entries())
    }

    pub fn snapshot(&self) -> DeskResult<InventorySnapshot> {
        self.read(Inventory::snapshot)
    }
}

fn nothing_recorded(what: &str) -> DeskError {
    DeskError::internal(format!("{what} recorded no change"))
}

fn log_event(event: &DeskEvent) {
    match event {
        DeskEvent::OverrideWaived(e) => tracing::warn!(
            event_type = event.event_type(),
            token = %e.token,
            context = %e.context,
            "override waived"
        ),
        DeskEvent::RadioCheckedOut(RadioCheckedOut { radio_id, record })
        | DeskEvent::RadioReturned(RadioReturned { radio_id, record }) => tracing::info!(
            event_type = event.event_type(),
            radio_id = %radio_id,
            borrower = record.borrower.as_deref().unwrap_or(""),
            department = record.department.as_deref().unwrap_or(""),
            headset = record.headset,
            occurred_at = %record.time,
            "radio"
        ),
        DeskEvent::AccessoryLent(e) => tracing::info!(
            event_type = event.event_type(),
            pool = %e.pool,
            borrower = %e.loan.borrower,
            department = e.loan.department.as_deref().unwrap_or(""),
            "accessory"
        ),
        DeskEvent::AccessoryReturned(e) => tracing::info!(
            event_type = event.event_type(),
            pool = %e.pool,
            borrower = %e.borrower,
            "accessory"
        ),
        DeskEvent::RadioCreated(_) | DeskEvent::RadioLocked(_) | DeskEvent::RadioUnlocked(_) => {
            tracing::info!(
                event_type = event.event_type(),
                occurred_at = %event.occurred_at(),
                "admin"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use radiodesk_core::{OverrideSet, OverrideToken, PolicyViolation, ViolationKind};
    use radiodesk_inventory::{LoanStatus, PoolKind, RadioStatus};

    use super::*;
    use crate::config::{ConfiguredRadio, DepartmentConfig};
    use crate::snapshot::{InMemorySnapshotStore, JsonFileSnapshotStore};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn rid(n: u32) -> RadioId {
        RadioId::new(n).unwrap()
    }

    fn config() -> DeskConfig {
        DeskConfig {
            radios: (1..=3).map(ConfiguredRadio::Number).collect(),
            headsets: 1,
            batteries: 2,
            departments: [
                ("Arcade".to_string(), DepartmentConfig { limit: Some(1) }),
                ("TechOps".to_string(), DepartmentConfig { limit: None }),
            ]
            .into_iter()
            .collect(),
            ..DeskConfig::default()
        }
    }

    fn open() -> (InventoryStore<Arc<InMemorySnapshotStore>>, Arc<InMemorySnapshotStore>) {
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let store = InventoryStore::open(&config(), Arc::clone(&snapshots)).unwrap();
        (store, snapshots)
    }

    fn checkout(radio: u32, who: &str, dept: Option<&str>, headset: bool, secs: i64) -> CheckoutRadio {
        CheckoutRadio {
            radio_id: rid(radio),
            department: dept.map(str::to_string),
            borrower: who.to_string(),
            badge: None,
            barcode: None,
            wants_headset: headset,
            overrides: OverrideSet::none(),
            occurred_at: at(secs),
        }
    }

    fn checkin(radio: u32, headset: bool, secs: i64) -> ReturnRadio {
        ReturnRadio::new(rid(radio), headset, at(secs))
    }

    fn battery(who: &str, dept: Option<&str>, secs: i64) -> CheckoutAccessory {
        CheckoutAccessory {
            pool: PoolKind::Battery,
            department: dept.map(str::to_string),
            borrower: who.to_string(),
            badge: None,
            barcode: None,
            overrides: OverrideSet::none(),
            occurred_at: at(secs),
        }
    }

    fn violation(err: &DeskError) -> ViolationKind {
        err.policy().map(PolicyViolation::kind).expect("policy violation")
    }

    #[test]
    fn open_registers_configured_radios_and_saves() {
        let (store, snapshots) = open();
        assert_eq!(snapshots.save_count(), 1);
        assert_eq!(snapshots.current().unwrap().radios.len(), 3);
        assert_eq!(store.radio(rid(2)).unwrap().status(), RadioStatus::CheckedIn);
    }

    #[test]
    fn open_keeps_stored_radio_state() {
        let (store, snapshots) = open();
        store.checkout_radio(checkout(1, "Alice", None, false, 10)).unwrap();

        let reopened = InventoryStore::open(&config(), Arc::clone(&snapshots)).unwrap();
        let radio = reopened.radio(rid(1)).unwrap();
        assert_eq!(radio.status(), RadioStatus::CheckedOut);
        assert_eq!(radio.checkout().borrower.as_deref(), Some("Alice"));
    }

    #[test]
    fn open_rejects_invalid_configured_id() {
        let mut config = config();
        config.radios.push(ConfiguredRadio::Text("zero".to_string()));
        let result = InventoryStore::open(&config, InMemorySnapshotStore::new());
        assert!(matches!(result, Err(DeskError::InvalidId(_))));
    }

    #[test]
    fn load_does_not_write() {
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let store = InventoryStore::load(&config(), Arc::clone(&snapshots)).unwrap();
        assert_eq!(snapshots.save_count(), 0);
        assert_eq!(store.read(|inv| inv.radios().count()).unwrap(), 3);
    }

    #[test]
    fn checkout_and_return_with_headset() {
        let (store, snapshots) = open();

        let record = store
            .checkout_radio(checkout(1, "Alice", Some("TechOps"), true, 10))
            .unwrap();
        assert_eq!(record.status, LoanStatus::CheckedOut);
        assert!(record.had_headset());
        assert_eq!(store.department_total("TechOps").unwrap(), 1);

        store.checkout_accessory(battery("Alice", Some("TechOps"), 11)).unwrap();

        let outcome = store.return_radio(checkin(1, true, 20)).unwrap();
        assert_eq!(outcome.record.status, LoanStatus::CheckedIn);
        assert_eq!(outcome.record.borrower.as_deref(), Some("Alice"));
        assert!(!outcome.headset_still_out());
        assert!(outcome.battery_still_out());
        assert_eq!(store.department_total("TechOps").unwrap(), 1);
        assert_eq!(snapshots.save_count(), 4);
    }

    #[test]
    fn plain_return_waives_identity_check_by_default() {
        let (store, _) = open();
        store.checkout_radio(checkout(1, "Alice", None, false, 10)).unwrap();

        let strict = checkin(1, false, 20).with_overrides(OverrideSet::none());
        let err = store.return_radio(strict).unwrap_err();
        assert_eq!(violation(&err), ViolationKind::WrongPerson);
        assert!(store.radio(rid(1)).unwrap().is_checked_out());

        let outcome = store.return_radio(checkin(1, false, 21)).unwrap();
        assert_eq!(outcome.record.borrower.as_deref(), Some("Alice"));
        assert_eq!(store.radio(rid(1)).unwrap().status(), RadioStatus::CheckedIn);
    }

    #[test]
    fn return_reports_standalone_headset_still_out() {
        let (store, _) = open();
        store.checkout_radio(checkout(2, "Alice", None, false, 10)).unwrap();
        let mut headset = battery("Alice", None, 11);
        headset.pool = PoolKind::Headset;
        store.checkout_accessory(headset).unwrap();

        let outcome = store.return_radio(checkin(2, false, 20).by("Alice")).unwrap();
        assert!(outcome.headset_still_out());
        assert!(!outcome.battery_still_out());
        assert_eq!(outcome.outstanding.radios, 0);
    }

    #[test]
    fn locked_radio_cannot_be_walked_back_in() {
        let (store, _) = open();
        store
            .lock_radio(LockRadio {
                radio_id: rid(3),
                reason: None,
                occurred_at: at(5),
            })
            .unwrap();

        let walk_up = checkin(3, false, 10).with_overrides(OverrideSet::walk_up_return());
        let err = store.return_radio(walk_up).unwrap_err();
        assert!(matches!(err, DeskError::InvalidTransition(_)));
        let radio = store.radio(rid(3)).unwrap();
        assert_eq!(radio.status(), RadioStatus::Locked);
        assert_eq!(radio.history().len(), 1);
    }

    #[test]
    fn missing_event_is_an_internal_error() {
        let err = nothing_recorded("radio checkout");
        assert!(matches!(err, DeskError::Internal(_)));
        assert!(!err.is_structural());
    }

    #[test]
    fn execute_returns_committed_events() {
        let (store, _) = open();
        let cmd = checkout(1, "Alice", Some("Arcade"), true, 10);

        let events = store.execute(DeskCommand::CheckoutRadio(cmd)).unwrap();
        let types: Vec<_> = events.iter().map(Event::event_type).collect();
        assert_eq!(types, vec!["desk.radio.checked_out", "desk.accessory.lent"]);
    }

    #[test]
    fn rejected_command_changes_nothing() {
        let (store, snapshots) = open();
        store.checkout_radio(checkout(1, "Alice", None, false, 10)).unwrap();
        let before = store.snapshot().unwrap();

        let err = store.checkout_radio(checkout(1, "Bob", None, false, 11)).unwrap_err();
        assert_eq!(violation(&err), ViolationKind::RadioUnavailable);
        assert_eq!(err.override_token(), Some(OverrideToken::AllowDoubleCheckout));
        assert_eq!(store.snapshot().unwrap(), before);
        assert_eq!(snapshots.save_count(), 2);
    }

    #[test]
    fn failed_save_leaves_memory_untouched() {
        let (store, snapshots) = open();
        snapshots.fail_saves(true);

        let err = store.checkout_radio(checkout(1, "Alice", None, false, 10)).unwrap_err();
        assert!(matches!(err, DeskError::Persistence(_)));
        assert_eq!(store.radio(rid(1)).unwrap().status(), RadioStatus::CheckedIn);

        snapshots.fail_saves(false);
        store.checkout_radio(checkout(1, "Alice", None, false, 11)).unwrap();
        assert_eq!(store.radio(rid(1)).unwrap().history().len(), 2);
    }

    #[test]
    fn department_quota_counts_accessories_across_pools() {
        let (store, _) = open();
        store.checkout_accessory(battery("Carol", Some("Arcade"), 10)).unwrap();

        let err = store
            .checkout_radio(checkout(2, "Dave", Some("Arcade"), true, 11))
            .unwrap_err();
        assert_eq!(violation(&err), ViolationKind::DepartmentOverLimit);

        let mut cmd = checkout(2, "Dave", Some("Arcade"), true, 12);
        cmd.overrides.insert(OverrideToken::AllowDepartmentOverdraft);
        store.checkout_radio(cmd).unwrap();
        assert_eq!(store.department_total("Arcade").unwrap(), 2);

        let audits = store.read(|inv| inv.audits().to_vec()).unwrap();
        assert_eq!(audits.len(), 1);
        assert!(audits[0].contains("ALLOW_DEPARTMENT_OVERDRAFT"));
    }

    #[test]
    fn accessory_return_requires_loan() {
        let (store, _) = open();
        let ret = ReturnAccessory {
            pool: PoolKind::Headset,
            borrower: "Nobody".to_string(),
            department: None,
            badge: None,
            barcode: None,
            occurred_at: at(10),
        };
        let err = store.return_accessory(ret.clone()).unwrap_err();
        assert_eq!(violation(&err), ViolationKind::NoOutstandingLoan);

        let mut lend = battery("Nobody", None, 11);
        lend.pool = PoolKind::Headset;
        store.checkout_accessory(lend).unwrap();
        let entry = store
            .return_accessory(ReturnAccessory {
                occurred_at: at(12),
                ..ret
            })
            .unwrap();
        assert_eq!(entry.status, LoanStatus::CheckedIn);
        assert_eq!(store.read(|inv| inv.headsets().outstanding_count()).unwrap(), 0);
    }

    #[test]
    fn create_lock_and_unlock_radio() {
        let (store, _) = open();
        let id = store.create_radio(" 42 ", at(5)).unwrap();
        assert_eq!(id, rid(42));
        assert!(matches!(store.create_radio("42", at(6)), Err(DeskError::RadioExists(_))));

        store
            .lock_radio(LockRadio {
                radio_id: id,
                reason: Some("cracked antenna".to_string()),
                occurred_at: at(7),
            })
            .unwrap();
        let err = store.checkout_radio(checkout(42, "Alice", None, false, 8)).unwrap_err();
        assert_eq!(violation(&err), ViolationKind::RadioLocked);

        store
            .unlock_radio(UnlockRadio {
                radio_id: id,
                occurred_at: at(9),
            })
            .unwrap();
        store.checkout_radio(checkout(42, "Alice", None, false, 10)).unwrap();
        assert_eq!(store.read(|inv| inv.audits().len()).unwrap(), 2);
    }

    #[test]
    fn history_for_borrower_is_chronological() {
        let (store, _) = open();
        store.checkout_radio(checkout(1, "Alice", Some("TechOps"), false, 10)).unwrap();
        store.checkout_accessory(battery("Alice", Some("TechOps"), 20)).unwrap();
        store.return_radio(checkin(1, false, 30)).unwrap();

        let entries = store.history_for("Alice", SubjectField::Borrower).unwrap();
        let times: Vec<_> = entries.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![at(10), at(20), at(30)]);
        assert_eq!(
            store.outstanding_for("Alice").unwrap(),
            NetTotals {
                radios: 0,
                headsets: 0,
                batteries: 1
            }
        );
        assert_eq!(store.history_for("TechOps", SubjectField::Department).unwrap().len(), 3);
    }

    #[test]
    fn file_backed_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("radios.json");

        {
            let store = InventoryStore::open(&config(), JsonFileSnapshotStore::new(&db)).unwrap();
            store.checkout_radio(checkout(3, "Erin", None, true, 10)).unwrap();
        }

        let store = InventoryStore::open(&config(), JsonFileSnapshotStore::new(&db)).unwrap();
        assert!(store.radio(rid(3)).unwrap().is_checked_out());
        assert_eq!(store.read(|inv| inv.headsets().available()).unwrap(), 0);
    }

    #[test]
    fn concurrent_checkouts_of_one_radio_admit_exactly_one() {
        let (store, _) = open();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .checkout_radio(checkout(1, &format!("person-{n}"), None, false, 10 + n))
                        .is_ok()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(store.radio(rid(1)).unwrap().history().len(), 2);
    }
}
