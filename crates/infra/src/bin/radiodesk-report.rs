//! Print the radios currently out and per-department accessory usage.
//!
//! Reads `$RADIODESK_CONFIG` (default `config.json`) and the snapshot it
//! points at. Never writes.

use anyhow::Context;

use radiodesk_infra::config::{self, DeskConfig};
use radiodesk_infra::{DeskSummary, InventoryStore, JsonFileSnapshotStore};
use radiodesk_observability::LogFormat;

fn main() -> anyhow::Result<()> {
    radiodesk_observability::init_with(LogFormat::from_env());

    let path = config::config_path_from_env();
    let config = DeskConfig::load(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;

    let store = InventoryStore::load(&config, JsonFileSnapshotStore::new(&config.db))
        .with_context(|| format!("reading inventory from {}", config.db.display()))?;
    let summary = store.read(DeskSummary::from_inventory)?;

    print!("{summary}");
    Ok(())
}
