use thiserror::Error;

/// Resolves scene paths to handles. A miss may be transient: the host can create the node later.
pub trait SceneLookup {
    type Handle: Clone;

    fn find_by_path(&self, path: &str) -> Option<Self::Handle>;
}

pub trait HandleControl: SceneLookup {
    fn set_active(&mut self, handle: &Self::Handle, active: bool);
}

pub trait ReadinessProbe {
    fn is_ready(&self) -> bool;
}

/// An NPC could not be found at its registered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("could not find {name} at {path}")]
pub struct LookupMiss {
    pub name: &'static str,
    pub path: &'static str,
}
