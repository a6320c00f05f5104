//! Read-only activity reconstruction over the append-only logs.
//!
//! [`HistoryIndex::history_for`] yields every radio record and accessory loan
//! entry whose borrower (or department) matches exactly, tagged with the kind
//! of resource it came from. Each source log is already chronological, so the
//! sequence is a lazy k-way merge and can be iterated again from the start.
//!
//! This is a linear scan of the full history per query, which is fine at desk
//! scale (hundreds of items, thousands of events).

use chrono::{DateTime, Utc};
use serde::Serialize;

use radiodesk_core::RadioId;

use crate::accessory::{AccessoryLoan, PoolKind};
use crate::inventory::Inventory;
use crate::radio::{CheckoutRecord, LoanStatus};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Radio,
    Headset,
    Battery,
}

impl From<PoolKind> for Resource {
    fn from(value: PoolKind) -> Self {
        match value {
            PoolKind::Headset => Resource::Headset,
            PoolKind::Battery => Resource::Battery,
        }
    }
}

/// Which field a history query matches on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubjectField {
    Borrower,
    Department,
}

/// One matching log entry, borrowed from the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEvent<'a> {
    pub resource: Resource,
    /// Set for radio records.
    pub radio_id: Option<RadioId>,
    pub status: LoanStatus,
    pub time: DateTime<Utc>,
    pub borrower: Option<&'a str>,
    pub department: Option<&'a str>,
    pub badge: Option<&'a str>,
}

impl TaggedEvent<'_> {
    pub fn to_entry(&self) -> HistoryEntry {
        HistoryEntry {
            resource: self.resource,
            radio_id: self.radio_id,
            status: self.status,
            time: self.time,
            borrower: self.borrower.map(str::to_string),
            department: self.department.map(str::to_string),
            badge: self.badge.map(str::to_string),
        }
    }
}

/// Owned form of [`TaggedEvent`], for use after the inventory lock is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub resource: Resource,
    pub radio_id: Option<RadioId>,
    pub status: LoanStatus,
    pub time: DateTime<Utc>,
    pub borrower: Option<String>,
    pub department: Option<String>,
    pub badge: Option<String>,
}

/// Signed "currently outstanding" counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetTotals {
    pub radios: i64,
    pub headsets: i64,
    pub batteries: i64,
}

impl NetTotals {
    /// +1 per checkout, -1 per return, on the counter of the event's own resource.
    pub fn record(&mut self, resource: Resource, status: LoanStatus) {
        let delta = match status {
            LoanStatus::CheckedOut => 1,
            LoanStatus::CheckedIn => -1,
        };
        match resource {
            Resource::Radio => self.radios += delta,
            Resource::Headset => self.headsets += delta,
            Resource::Battery => self.batteries += delta,
        }
    }
}

/// Anything carrying a resource tag and a loan direction.
pub trait Tagged {
    fn resource(&self) -> Resource;
    fn status(&self) -> LoanStatus;
}

impl Tagged for TaggedEvent<'_> {
    fn resource(&self) -> Resource {
        self.resource
    }

    fn status(&self) -> LoanStatus {
        self.status
    }
}

impl Tagged for HistoryEntry {
    fn resource(&self) -> Resource {
        self.resource
    }

    fn status(&self) -> LoanStatus {
        self.status
    }
}

impl<T: Tagged + ?Sized> Tagged for &T {
    fn resource(&self) -> Resource {
        (**self).resource()
    }

    fn status(&self) -> LoanStatus {
        (**self).status()
    }
}

/// Fold a tagged event sequence into net outstanding counts.
pub fn net_totals<I>(events: I) -> NetTotals
where
    I: IntoIterator,
    I::Item: Tagged,
{
    events.into_iter().fold(NetTotals::default(), |mut totals, e| {
        totals.record(e.resource(), e.status());
        totals
    })
}

#[derive(Debug, Copy, Clone)]
enum Source<'a> {
    Radio(RadioId, &'a [CheckoutRecord]),
    Pool(Resource, &'a [AccessoryLoan]),
}

impl<'a> Source<'a> {
    fn len(&self) -> usize {
        match self {
            Source::Radio(_, records) => records.len(),
            Source::Pool(_, loans) => loans.len(),
        }
    }

    fn event_at(&self, pos: usize) -> TaggedEvent<'a> {
        match *self {
            Source::Radio(id, records) => {
                let r = &records[pos];
                TaggedEvent {
                    resource: Resource::Radio,
                    radio_id: Some(id),
                    status: r.status,
                    time: r.time,
                    borrower: r.borrower.as_deref(),
                    department: r.department.as_deref(),
                    badge: r.badge.as_deref(),
                }
            }
            Source::Pool(resource, loans) => {
                let l = &loans[pos];
                TaggedEvent {
                    resource,
                    radio_id: None,
                    status: l.status,
                    time: l.time,
                    borrower: Some(l.borrower.as_str()),
                    department: l.department.as_deref(),
                    badge: l.badge.as_deref(),
                }
            }
        }
    }
}

/// Read-only query entry point over an [`Inventory`].
#[derive(Debug, Clone, Copy)]
pub struct HistoryIndex<'a> {
    inventory: &'a Inventory,
}

impl<'a> HistoryIndex<'a> {
    pub fn new(inventory: &'a Inventory) -> Self {
        Self { inventory }
    }

    pub fn history_for(&self, subject: &str, by: SubjectField) -> History<'a> {
        let mut sources: Vec<Source<'a>> = self
            .inventory
            .radios()
            .map(|(id, radio)| Source::Radio(id, radio.history()))
            .collect();
        for kind in [PoolKind::Headset, PoolKind::Battery] {
            sources.push(Source::Pool(kind.into(), self.inventory.pool(kind).history()));
        }
        History {
            sources,
            subject: subject.to_string(),
            by,
        }
    }
}

/// A restartable, chronologically ordered view of one subject's activity.
#[derive(Debug, Clone)]
pub struct History<'a> {
    sources: Vec<Source<'a>>,
    subject: String,
    by: SubjectField,
}

impl<'a> History<'a> {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn iter(&self) -> HistoryIter<'_> {
        HistoryIter {
            cursors: self.sources.iter().map(|s| (*s, 0)).collect(),
            subject: &self.subject,
            by: self.by,
        }
    }

    pub fn net_totals(&self) -> NetTotals {
        net_totals(self.iter())
    }

    pub fn to_entries(&self) -> Vec<HistoryEntry> {
        self.iter().map(|e| e.to_entry()).collect()
    }
}

impl<'h, 'a> IntoIterator for &'h History<'a> {
    type Item = TaggedEvent<'h>;
    type IntoIter = HistoryIter<'h>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct HistoryIter<'a> {
    cursors: Vec<(Source<'a>, usize)>,
    subject: &'a str,
    by: SubjectField,
}

impl<'a> HistoryIter<'a> {
    fn matches(&self, event: &TaggedEvent<'_>) -> bool {
        let field = match self.by {
            SubjectField::Borrower => event.borrower,
            SubjectField::Department => event.department,
        };
        field == Some(self.subject)
    }

    /// Advance `idx` past non-matching entries; return its next matching event.
    fn head(&mut self, idx: usize) -> Option<TaggedEvent<'a>> {
        loop {
            let (source, pos) = self.cursors[idx];
            if pos >= source.len() {
                return None;
            }
            let event = source.event_at(pos);
            if self.matches(&event) {
                return Some(event);
            }
            self.cursors[idx].1 += 1;
        }
    }
}

impl<'a> Iterator for HistoryIter<'a> {
    type Item = TaggedEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut best: Option<(usize, TaggedEvent<'a>)> = None;
        for idx in 0..self.cursors.len() {
            if let Some(event) = self.head(idx) {
                // strict: ties keep the earlier source
                if best.as_ref().is_none_or(|(_, b)| event.time < b.time) {
                    best = Some((idx, event));
                }
            }
        }
        let (idx, event) = best?;
        self.cursors[idx].1 += 1;
        Some(event)
    }
}
