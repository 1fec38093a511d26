use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flags::SoulFlags;
use crate::registry::NpcRegistry;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read slot settings {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse slot settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown soul item '{item}' in starting souls")]
    UnknownItem { item: String },
}

/// Per-session options handed over by the multiworld slot data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlotSettings {
    pub include_npc_souls: bool,
    pub starting_souls: Vec<String>,
}

impl Default for SlotSettings {
    fn default() -> Self {
        Self {
            include_npc_souls: true,
            starting_souls: Vec::new(),
        }
    }
}

impl SlotSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn build_flags(&self, registry: &NpcRegistry) -> Result<SoulFlags, SettingsError> {
        let mut flags = SoulFlags::new(self.include_npc_souls);
        for item in &self.starting_souls {
            if flags.receive_item(registry, item).is_none() {
                return Err(SettingsError::UnknownItem { item: item.clone() });
            }
        }
        Ok(flags)
    }
}
