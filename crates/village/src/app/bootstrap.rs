use std::env;
use std::path::PathBuf;

use engine::{LoopConfig, Scene};
use npc_souls::{SettingsError, SlotSettings, GOOSE_VILLAGE};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::script::{default_script, load_script, ScriptError};
use super::village_scene::VillageScene;

const SCRIPT_ENV_VAR: &str = "SOULS_SESSION_SCRIPT";
const SLOT_SETTINGS_ENV_VAR: &str = "SOULS_SLOT_SETTINGS";
const DUMP_PATH_ENV_VAR: &str = "SOULS_DUMP_PATH";

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("environment variable {var} is not valid unicode")]
    NonUnicodeEnv { var: &'static str },
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app(args: &[String]) -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Village Souls Startup ===");

    let mut script = match resolve_script_path(args)? {
        Some(path) => {
            info!(path = %path.display(), "session_script_file");
            load_script(&path, &GOOSE_VILLAGE)?
        }
        None => {
            info!("session_script_builtin");
            default_script()
        }
    };
    if let Some(path) = read_path_env(SLOT_SETTINGS_ENV_VAR)? {
        info!(path = %path.display(), "slot_settings_file");
        script.settings = SlotSettings::load(&path)?;
    }
    let dump_path = read_path_env(DUMP_PATH_ENV_VAR)?;

    let scene = VillageScene::new(GOOSE_VILLAGE, script, dump_path)?;
    Ok(AppWiring {
        config: LoopConfig::default().with_env_overrides(),
        scene: Box::new(scene),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_script_path(args: &[String]) -> Result<Option<PathBuf>, StartupError> {
    match args.first() {
        Some(arg) => Ok(Some(PathBuf::from(arg))),
        None => read_path_env(SCRIPT_ENV_VAR),
    }
}

fn read_path_env(var: &'static str) -> Result<Option<PathBuf>, StartupError> {
    match env::var(var) {
        Ok(raw) => Ok(parse_path_value(&raw)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(StartupError::NonUnicodeEnv { var }),
    }
}

fn parse_path_value(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}
