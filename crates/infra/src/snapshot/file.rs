use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use radiodesk_inventory::InventorySnapshot;

use super::r#trait::{SnapshotError, SnapshotStore};

/// Snapshot stored as a single JSON file.
///
/// Saves write `<path>.tmp`, fsync it, then rename over `path`.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self) -> Result<Option<InventorySnapshot>, SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SnapshotError::io(&self.path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| SnapshotError::Malformed {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, snapshot: &InventorySnapshot) -> Result<(), SnapshotError> {
        let tmp = self.temp_path();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;
        }

        let file = File::create(&tmp).map_err(|e| SnapshotError::io(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot).map_err(|source| {
            SnapshotError::Malformed {
                path: tmp.clone(),
                source,
            }
        })?;
        writer.flush().map_err(|e| SnapshotError::io(&tmp, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| SnapshotError::io(&tmp, e.into_error()))?;
        file.sync_all().map_err(|e| SnapshotError::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| SnapshotError::io(&self.path, e))
    }
}
