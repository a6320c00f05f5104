//! Desk configuration file.
//!
//! Totals and department limits come from here on every start and are never
//! persisted with the snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use radiodesk_core::{DeskResult, RadioId};
use radiodesk_inventory::DepartmentLimits;

pub const CONFIG_ENV: &str = "RADIODESK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_DB_PATH: &str = "radios.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A configured radio id; the file may list them as numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConfiguredRadio {
    Number(i64),
    Text(String),
}

impl ConfiguredRadio {
    pub fn radio_id(&self) -> DeskResult<RadioId> {
        match self {
            ConfiguredRadio::Number(n) => n.to_string().parse(),
            ConfiguredRadio::Text(s) => s.parse(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DepartmentConfig {
    /// `None` means unlimited.
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeskConfig {
    #[serde(default = "default_db")]
    pub db: PathBuf,
    #[serde(default)]
    pub radios: Vec<ConfiguredRadio>,
    #[serde(default)]
    pub headsets: u32,
    #[serde(default)]
    pub batteries: u32,
    #[serde(default)]
    pub departments: BTreeMap<String, DepartmentConfig>,
}

fn default_db() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            db: default_db(),
            radios: Vec::new(),
            headsets: 0,
            batteries: 0,
            departments: BTreeMap::new(),
        }
    }
}

impl DeskConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Configured ids in file order; the first invalid entry fails the lot.
    pub fn radio_ids(&self) -> DeskResult<Vec<RadioId>> {
        self.radios.iter().map(ConfiguredRadio::radio_id).collect()
    }

    pub fn limits(&self) -> DepartmentLimits {
        self.departments
            .iter()
            .map(|(name, dept)| (name.clone(), dept.limit))
            .collect()
    }
}

/// Path of the config file: `$RADIODESK_CONFIG`, else `config.json`.
pub fn config_path_from_env() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
