//! Whole-document persistence for the desk inventory.
//!
//! Every committed mutation rewrites the full snapshot; there is no
//! incremental log. Implementations must make a save atomic: a crash mid-save
//! leaves either the old or the new document on disk.

pub mod file;
pub mod in_memory;
pub mod r#trait;

pub use file::JsonFileSnapshotStore;
pub use in_memory::InMemorySnapshotStore;
pub use r#trait::{SnapshotError, SnapshotStore};
