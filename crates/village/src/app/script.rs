use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use npc_souls::{NpcRegistry, SettingsError, SlotSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read session script {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse session script {path}{at}: {source}")]
    Parse {
        path: PathBuf,
        at: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("session script {section} names unknown npc '{name}'")]
    UnknownNpc { section: &'static str, name: String },
    #[error("session script lists '{name}' as both missing and late")]
    MissingAndLate { name: String },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Scripted stand-in for a live multiworld session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SessionScript {
    #[serde(default)]
    pub(crate) settings: SlotSettings,
    /// Ticks after session start before the geese exist and the scene counts as loaded.
    #[serde(default = "default_load_ticks")]
    pub(crate) load_ticks: u64,
    #[serde(default)]
    pub(crate) missing_npcs: Vec<String>,
    #[serde(default)]
    pub(crate) late_npcs: Vec<LateNpc>,
    #[serde(default)]
    pub(crate) events: Vec<TimedEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LateNpc {
    pub(crate) name: String,
    /// Session-relative tick the node appears on.
    pub(crate) after_ticks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TimedEvent {
    /// Loop tick, counted across sessions.
    pub(crate) tick: u64,
    #[serde(flatten)]
    pub(crate) event: ScriptEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum ScriptEvent {
    ReceiveItem { item: String },
    SetSoulsEnabled { enabled: bool },
    Reconnect,
    ReturnToMenu,
    Quit,
}

fn default_load_ticks() -> u64 {
    30
}

impl SessionScript {
    pub(crate) fn validate(&self, registry: &NpcRegistry) -> Result<(), ScriptError> {
        for name in &self.missing_npcs {
            if registry.record(name).is_none() {
                return Err(ScriptError::UnknownNpc {
                    section: "missing_npcs",
                    name: name.clone(),
                });
            }
        }
        for late in &self.late_npcs {
            if registry.record(&late.name).is_none() {
                return Err(ScriptError::UnknownNpc {
                    section: "late_npcs",
                    name: late.name.clone(),
                });
            }
            if self.missing_npcs.contains(&late.name) {
                return Err(ScriptError::MissingAndLate {
                    name: late.name.clone(),
                });
            }
        }
        Ok(())
    }

    // Stable: same-tick events keep script order.
    pub(crate) fn sorted_events(&self) -> Vec<TimedEvent> {
        let mut events = self.events.clone();
        events.sort_by_key(|event| event.tick);
        events
    }

    pub(crate) fn is_missing(&self, name: &str) -> bool {
        self.missing_npcs.iter().any(|missing| missing == name)
    }

    pub(crate) fn is_late(&self, name: &str) -> bool {
        self.late_npcs.iter().any(|late| late.name == name)
    }
}

pub(crate) fn load_script(
    path: &Path,
    registry: &NpcRegistry,
) -> Result<SessionScript, ScriptError> {
    let raw = fs::read_to_string(path).map_err(|source| ScriptError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let script = parse_script(&raw, path)?;
    script.validate(registry)?;
    Ok(script)
}

fn parse_script(raw: &str, origin: &Path) -> Result<SessionScript, ScriptError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SessionScript>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let at = if path.is_empty() || path == "." {
            String::new()
        } else {
            format!(" at {path}")
        };
        ScriptError::Parse {
            path: origin.to_path_buf(),
            at,
            source: error.into_inner(),
        }
    })
}

pub(crate) fn default_script() -> SessionScript {
    SessionScript {
        settings: SlotSettings {
            include_npc_souls: true,
            starting_souls: vec!["Market Lady Soul".to_string()],
        },
        load_ticks: default_load_ticks(),
        missing_npcs: vec!["OldMan".to_string()],
        late_npcs: vec![LateNpc {
            name: "Cook".to_string(),
            after_ticks: 90,
        }],
        events: vec![
            timed(60, ScriptEvent::ReceiveItem {
                item: "Boy Soul".to_string(),
            }),
            timed(120, ScriptEvent::ReceiveItem {
                item: "Cook Soul".to_string(),
            }),
            timed(150, ScriptEvent::ReceiveItem {
                item: "Fancy Ladies Soul".to_string(),
            }),
            timed(200, ScriptEvent::ReturnToMenu),
            timed(260, ScriptEvent::ReceiveItem {
                item: "Old Man Soul".to_string(),
            }),
            timed(300, ScriptEvent::SetSoulsEnabled { enabled: false }),
            timed(330, ScriptEvent::SetSoulsEnabled { enabled: true }),
            timed(360, ScriptEvent::Reconnect),
            timed(400, ScriptEvent::Quit),
        ],
    }
}

fn timed(tick: u64, event: ScriptEvent) -> TimedEvent {
    TimedEvent { tick, event }
}
