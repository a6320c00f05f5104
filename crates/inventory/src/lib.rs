//! Equipment desk domain module.
//!
//! This crate contains the borrowing rules for radios and accessory pools,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).
//! [`Inventory`] decides commands into [`DeskEvent`]s and applies them;
//! [`HistoryIndex`] answers read-only activity questions over the logs.

pub mod accessory;
pub mod command;
pub mod engine;
pub mod event;
pub mod history;
pub mod inventory;
pub mod limits;
pub mod radio;

pub use accessory::{AccessoryLoan, AccessoryPool, PoolKind};
pub use command::{
    CheckoutAccessory, CheckoutRadio, CreateRadio, DeskCommand, LockRadio, ReturnAccessory,
    ReturnRadio, UnlockRadio,
};
pub use engine::CheckoutEngine;
pub use event::{
    AccessoryLent, AccessoryReturned, DeskEvent, OverrideWaived, RadioCheckedOut, RadioCreated,
    RadioLockChanged, RadioReturned,
};
pub use history::{
    History, HistoryEntry, HistoryIndex, NetTotals, Resource, SubjectField, Tagged, TaggedEvent,
    net_totals,
};
pub use inventory::{Inventory, InventorySnapshot};
pub use limits::DepartmentLimits;
pub use radio::{CheckoutRecord, LoanStatus, Radio, RadioStatus};
