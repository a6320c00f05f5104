//! Fungible accessory pools (headsets, batteries).
//!
//! A pool keeps an unordered **outstanding set** of loans currently out and an
//! append-only **history log** of every lend and return. Loans carry no durable
//! identifier: a return closes the *first* outstanding loan whose borrower name
//! matches exactly, so two simultaneous loans under one name are
//! indistinguishable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use radiodesk_core::{
    DeskResult, OverrideSet, OverrideToken, PolicyViolation, ViolationKind,
};

use crate::command::{CheckoutAccessory, ReturnAccessory};
use crate::event::{AccessoryLent, AccessoryReturned, DeskEvent};
use crate::limits::DepartmentLimits;
use crate::radio::LoanStatus;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Headset,
    Battery,
}

impl PoolKind {
    pub fn label(self) -> &'static str {
        match self {
            PoolKind::Headset => "headset",
            PoolKind::Battery => "battery",
        }
    }

    /// Only headset exhaustion may be overridden; batteries are a hard limit.
    pub fn capacity_waivable(self) -> bool {
        matches!(self, PoolKind::Headset)
    }
}

impl core::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// One lend or return entry of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryLoan {
    pub department: Option<String>,
    pub borrower: String,
    pub badge: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    pub time: DateTime<Utc>,
    pub status: LoanStatus,
}

/// Capacity-bounded pool of identical accessories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryPool {
    kind: PoolKind,
    capacity: u32,
    outstanding: Vec<AccessoryLoan>,
    history: Vec<AccessoryLoan>,
}

impl AccessoryPool {
    pub fn new(kind: PoolKind, capacity: u32) -> Self {
        Self::restore(kind, capacity, Vec::new(), Vec::new())
    }

    /// Rebuild a pool from persisted collections.
    pub fn restore(
        kind: PoolKind,
        capacity: u32,
        outstanding: Vec<AccessoryLoan>,
        history: Vec<AccessoryLoan>,
    ) -> Self {
        Self {
            kind,
            capacity,
            outstanding,
            history,
        }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity;
    }

    pub fn outstanding(&self) -> &[AccessoryLoan] {
        &self.outstanding
    }

    pub fn history(&self) -> &[AccessoryLoan] {
        &self.history
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    /// Capacity minus outstanding; negative after overridden overdrafts.
    pub fn available(&self) -> i64 {
        i64::from(self.capacity) - self.outstanding.len() as i64
    }

    pub fn department_count(&self, department: &str) -> usize {
        self.outstanding
            .iter()
            .filter(|loan| loan.department.as_deref() == Some(department))
            .count()
    }

    /// First outstanding loan held under `borrower`.
    pub fn find_loan(&self, borrower: &str) -> Option<&AccessoryLoan> {
        self.outstanding.iter().find(|loan| loan.borrower == borrower)
    }

    /// Time to stamp the next entry with: never earlier than the last one
    /// logged, so the history stays chronological.
    pub fn next_stamp(&self, occurred_at: DateTime<Utc>) -> DateTime<Utc> {
        self.history
            .last()
            .map_or(occurred_at, |last| occurred_at.max(last.time))
    }

    /// Capacity check for lending one more item.
    pub fn check_capacity(&self, overrides: &OverrideSet) -> DeskResult<Option<OverrideToken>> {
        if self.outstanding.len() < self.capacity as usize {
            return Ok(None);
        }
        let violation = PolicyViolation::new(
            ViolationKind::PoolExhausted,
            format!("No {}s left", self.kind.label()),
        );
        let violation = if self.kind.capacity_waivable() {
            violation
        } else {
            violation.not_waivable()
        };
        overrides.waive(violation).map(Some)
    }

    /// Decide a standalone checkout.
    ///
    /// `department_total` is the department's outstanding count across every pool.
    pub fn decide_checkout(
        &self,
        cmd: &CheckoutAccessory,
        department_total: usize,
        limits: &DepartmentLimits,
    ) -> DeskResult<Vec<DeskEvent>> {
        let stamp = self.next_stamp(cmd.occurred_at);
        let mut events = Vec::new();

        if let Some(token) = self.check_capacity(&cmd.overrides)? {
            events.push(DeskEvent::waived(
                token,
                format!("{} lent to {} beyond capacity {}", self.kind, cmd.borrower, self.capacity),
                stamp,
            ));
        }
        if let Some(token) = limits.check(cmd.department.as_deref(), department_total, &cmd.overrides)? {
            events.push(DeskEvent::waived(
                token,
                format!(
                    "{} lent to {} over department limit",
                    self.kind,
                    cmd.borrower
                ),
                stamp,
            ));
        }

        events.push(DeskEvent::AccessoryLent(AccessoryLent {
            pool: self.kind,
            loan: AccessoryLoan {
                department: cmd.department.clone(),
                borrower: cmd.borrower.clone(),
                badge: cmd.badge.clone(),
                barcode: cmd.barcode.clone(),
                time: stamp,
                status: LoanStatus::CheckedOut,
            },
        }));
        Ok(events)
    }

    /// Decide a return: closes the first loan held under the borrower's name.
    pub fn decide_return(&self, cmd: &ReturnAccessory) -> DeskResult<Vec<DeskEvent>> {
        let loan = self.find_loan(&cmd.borrower).ok_or_else(|| {
            PolicyViolation::new(
                ViolationKind::NoOutstandingLoan,
                format!("No {} loan found to check in for {}", self.kind, cmd.borrower),
            )
        })?;

        Ok(vec![DeskEvent::AccessoryReturned(AccessoryReturned {
            pool: self.kind,
            borrower: cmd.borrower.clone(),
            entry: AccessoryLoan {
                department: cmd.department.clone().or_else(|| loan.department.clone()),
                borrower: cmd.borrower.clone(),
                badge: cmd.badge.clone().or_else(|| loan.badge.clone()),
                barcode: cmd.barcode.clone(),
                time: self.next_stamp(cmd.occurred_at),
                status: LoanStatus::CheckedIn,
            },
        })])
    }

    pub(crate) fn lend(&mut self, loan: AccessoryLoan) {
        self.history.push(loan.clone());
        self.outstanding.push(loan);
    }

    pub(crate) fn take_back(&mut self, borrower: &str, entry: AccessoryLoan) {
        if let Some(pos) = self.outstanding.iter().position(|l| l.borrower == borrower) {
            self.outstanding.remove(pos);
        }
        self.history.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use radiodesk_core::DeskError;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn lend_cmd(pool: PoolKind, borrower: &str, dept: Option<&str>) -> CheckoutAccessory {
        CheckoutAccessory {
            pool,
            department: dept.map(str::to_string),
            borrower: borrower.to_string(),
            badge: None,
            barcode: None,
            overrides: OverrideSet::none(),
            occurred_at: at(10),
        }
    }

    fn apply_all(pool: &mut AccessoryPool, events: Vec<DeskEvent>) {
        for event in events {
            match event {
                DeskEvent::AccessoryLent(e) => pool.lend(e.loan),
                DeskEvent::AccessoryReturned(e) => pool.take_back(&e.borrower, e.entry),
                _ => {}
            }
        }
    }

    fn policy_kind(err: DeskError) -> ViolationKind {
        err.policy().map(PolicyViolation::kind).expect("policy violation")
    }

    #[test]
    fn exhausted_headset_pool_requires_negative_count_override() {
        let mut pool = AccessoryPool::new(PoolKind::Headset, 1);
        let limits = DepartmentLimits::new();
        let events = pool.decide_checkout(&lend_cmd(PoolKind::Headset, "Alice", None), 0, &limits).unwrap();
        apply_all(&mut pool, events);

        let err = pool
            .decide_checkout(&lend_cmd(PoolKind::Headset, "Bob", None), 0, &limits)
            .unwrap_err();
        assert_eq!(err.override_token(), Some(OverrideToken::AllowNegativeCount));
        assert_eq!(policy_kind(err), ViolationKind::PoolExhausted);

        let mut cmd = lend_cmd(PoolKind::Headset, "Bob", None);
        cmd.overrides.insert(OverrideToken::AllowNegativeCount);
        let events = pool.decide_checkout(&cmd, 0, &limits).unwrap();
        assert!(matches!(events[0], DeskEvent::OverrideWaived(_)));
        apply_all(&mut pool, events);

        assert_eq!(pool.outstanding_count(), 2);
        assert_eq!(pool.available(), -1);
    }

    #[test]
    fn exhausted_battery_pool_is_never_waivable() {
        let pool = AccessoryPool::new(PoolKind::Battery, 0);
        let mut cmd = lend_cmd(PoolKind::Battery, "Alice", None);
        cmd.overrides = OverrideToken::ALL.into_iter().collect();

        let err = pool.decide_checkout(&cmd, 0, &DepartmentLimits::new()).unwrap_err();
        assert_eq!(policy_kind(err.clone()), ViolationKind::PoolExhausted);
        assert_eq!(err.override_token(), None);
    }

    #[test]
    fn return_closes_first_matching_loan_and_logs_entry() {
        let mut pool = AccessoryPool::new(PoolKind::Battery, 5);
        let limits = DepartmentLimits::new();
        for (who, dept) in [("Alice", "Arcade"), ("Bob", "TechOps"), ("Alice", "TechOps")] {
            let events = pool
                .decide_checkout(&lend_cmd(PoolKind::Battery, who, Some(dept)), 0, &limits)
                .unwrap();
            apply_all(&mut pool, events);
        }

        let ret = ReturnAccessory {
            pool: PoolKind::Battery,
            borrower: "Alice".to_string(),
            department: None,
            badge: Some("1234".to_string()),
            barcode: None,
            occurred_at: at(20),
        };
        let events = pool.decide_return(&ret).unwrap();
        apply_all(&mut pool, events);

        assert_eq!(pool.outstanding_count(), 2);
        // first Alice loan (Arcade) is the one closed
        assert_eq!(pool.department_count("Arcade"), 0);
        assert_eq!(pool.department_count("TechOps"), 2);

        let last = pool.history().last().unwrap();
        assert_eq!(last.status, LoanStatus::CheckedIn);
        assert_eq!(last.department.as_deref(), Some("Arcade"));
        assert_eq!(last.badge.as_deref(), Some("1234"));
        assert_eq!(pool.history().len(), 4);
    }

    #[test]
    fn return_without_loan_fails() {
        let pool = AccessoryPool::new(PoolKind::Headset, 5);
        let ret = ReturnAccessory {
            pool: PoolKind::Headset,
            borrower: "Nobody".to_string(),
            department: None,
            badge: None,
            barcode: None,
            occurred_at: at(20),
        };
        let err = pool.decide_return(&ret).unwrap_err();
        assert_eq!(policy_kind(err), ViolationKind::NoOutstandingLoan);
    }

    #[test]
    fn entries_logged_out_of_order_are_clamped_forward() {
        let mut pool = AccessoryPool::new(PoolKind::Battery, 5);
        let limits = DepartmentLimits::new();

        let mut late = lend_cmd(PoolKind::Battery, "Alice", None);
        late.occurred_at = at(20);
        let events = pool.decide_checkout(&late, 0, &limits).unwrap();
        apply_all(&mut pool, events);

        let mut early = lend_cmd(PoolKind::Battery, "Alice", None);
        early.occurred_at = at(10);
        let events = pool.decide_checkout(&early, 0, &limits).unwrap();
        apply_all(&mut pool, events);

        let ret = ReturnAccessory {
            pool: PoolKind::Battery,
            borrower: "Alice".to_string(),
            department: None,
            badge: None,
            barcode: None,
            occurred_at: at(5),
        };
        let events = pool.decide_return(&ret).unwrap();
        apply_all(&mut pool, events);

        let times: Vec<_> = pool.history().iter().map(|l| l.time).collect();
        assert_eq!(times, vec![at(20), at(20), at(20)]);
    }

    #[test]
    fn department_quota_applies_to_standalone_loans() {
        let pool = AccessoryPool::new(PoolKind::Battery, 10);
        let limits: DepartmentLimits = [("Arcade", Some(2))].into_iter().collect();

        let err = pool
            .decide_checkout(&lend_cmd(PoolKind::Battery, "Carol", Some("Arcade")), 2, &limits)
            .unwrap_err();
        assert_eq!(policy_kind(err), ViolationKind::DepartmentOverLimit);
    }
}
