use std::path::PathBuf;
use std::sync::Arc;

use radiodesk_core::DeskError;
use radiodesk_inventory::InventorySnapshot;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot at {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}

impl SnapshotError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<SnapshotError> for DeskError {
    fn from(err: SnapshotError) -> Self {
        DeskError::persistence(err.to_string())
    }
}

/// Load/save the persisted inventory document.
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<InventorySnapshot>, SnapshotError>;

    fn save(&self, snapshot: &InventorySnapshot) -> Result<(), SnapshotError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Arc<S> {
    fn load(&self) -> Result<Option<InventorySnapshot>, SnapshotError> {
        (**self).load()
    }

    fn save(&self, snapshot: &InventorySnapshot) -> Result<(), SnapshotError> {
        (**self).save(snapshot)
    }
}
