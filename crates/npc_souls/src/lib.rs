//! Soul-gated NPC visibility.
//!
//! [`VisibilityManager`] discovers the registry's NPCs in the host scene once it is ready, then
//! keeps each NPC's active state in line with the session's soul flags. The host scene and the
//! flag source are reached only through the traits in this crate.

mod flags;
mod host;
mod manager;
mod registry;
mod settings;

pub use flags::{FlagsProvider, SoulFlags};
pub use host::{HandleControl, LookupMiss, ReadinessProbe, SceneLookup};
pub use manager::{DiscoveryReport, VisibilityManager};
pub use registry::{NpcRecord, NpcRegistry, SoulGroup, GOOSE_VILLAGE};
pub use settings::{SettingsError, SlotSettings};
