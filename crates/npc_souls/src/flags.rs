use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::registry::{NpcRegistry, SoulGroup};

/// Read-only view of the session's soul state. Implementations are polled on every call and
/// must reflect the live values.
pub trait FlagsProvider {
    fn souls_enabled(&self) -> bool;
    fn has_soul(&self, flag: &str) -> bool;
}

impl<T: FlagsProvider + ?Sized> FlagsProvider for &T {
    fn souls_enabled(&self) -> bool {
        (**self).souls_enabled()
    }

    fn has_soul(&self, flag: &str) -> bool {
        (**self).has_soul(flag)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoulFlags {
    souls_enabled: bool,
    possessed: BTreeSet<String>,
}

impl SoulFlags {
    pub fn new(souls_enabled: bool) -> Self {
        Self {
            souls_enabled,
            possessed: BTreeSet::new(),
        }
    }

    pub fn set_souls_enabled(&mut self, souls_enabled: bool) {
        self.souls_enabled = souls_enabled;
    }

    pub fn grant(&mut self, flag: &str) -> bool {
        self.possessed.insert(flag.to_string())
    }

    pub fn revoke(&mut self, flag: &str) -> bool {
        self.possessed.remove(flag)
    }

    pub fn possessed(&self) -> impl Iterator<Item = &str> {
        self.possessed.iter().map(String::as_str)
    }

    /// Grants the flag behind a received soul item such as `"Boy Soul"`.
    pub fn receive_item(
        &mut self,
        registry: &NpcRegistry,
        item_name: &str,
    ) -> Option<&'static SoulGroup> {
        let group = registry.group_for_item(item_name)?;
        self.grant(group.flag);
        Some(group)
    }
}

impl FlagsProvider for SoulFlags {
    fn souls_enabled(&self) -> bool {
        self.souls_enabled
    }

    fn has_soul(&self, flag: &str) -> bool {
        self.possessed.contains(flag)
    }
}
