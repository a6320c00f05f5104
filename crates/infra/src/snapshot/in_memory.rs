use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use radiodesk_inventory::InventorySnapshot;

use super::r#trait::{SnapshotError, SnapshotStore};

/// In-memory snapshot store.
///
/// Intended for tests/dev. `fail_saves` simulates a broken disk.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    document: RwLock<Option<InventorySnapshot>>,
    saves: AtomicU64,
    fail_saves: AtomicBool,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: InventorySnapshot) -> Self {
        Self {
            document: RwLock::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<InventorySnapshot> {
        self.document.read().ok().and_then(|doc| doc.clone())
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self) -> Result<Option<InventorySnapshot>, SnapshotError> {
        let document = self
            .document
            .read()
            .map_err(|_| SnapshotError::Unavailable("lock poisoned".to_string()))?;
        Ok(document.clone())
    }

    fn save(&self, snapshot: &InventorySnapshot) -> Result<(), SnapshotError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SnapshotError::Unavailable("simulated save failure".to_string()));
        }
        let mut document = self
            .document
            .write()
            .map_err(|_| SnapshotError::Unavailable("lock poisoned".to_string()))?;
        *document = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
