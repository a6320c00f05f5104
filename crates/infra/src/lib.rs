//! Infrastructure layer: configuration, snapshot persistence, badge lookup,
//! and the lock-guarded inventory store.

pub mod badge;
pub mod config;
pub mod report;
pub mod snapshot;
pub mod store;

pub use badge::{BadgeDirectory, BadgeHolder, InMemoryBadgeDirectory, LookupError, PersonInfo, resolve_person};
pub use config::{ConfigError, DeskConfig};
pub use report::DeskSummary;
pub use snapshot::{InMemorySnapshotStore, JsonFileSnapshotStore, SnapshotError, SnapshotStore};
pub use store::{InventoryStore, ReturnOutcome};
