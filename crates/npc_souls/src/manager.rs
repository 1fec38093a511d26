use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::flags::FlagsProvider;
use crate::host::{HandleControl, LookupMiss, ReadinessProbe, SceneLookup};
use crate::registry::{NpcRecord, NpcRegistry};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub found: Vec<&'static str>,
    pub missing: Vec<LookupMiss>,
}

/// Finds registry NPCs once per session and keeps their active state in line with the soul
/// flags.
///
/// Handles are cached until [`VisibilityManager::reset`]. Flags are never cached: every call
/// reads them from the provider it is given.
#[derive(Debug)]
pub struct VisibilityManager<H> {
    registry: NpcRegistry,
    cache: HashMap<&'static str, H>,
    has_scanned: bool,
}

impl<H: Clone> VisibilityManager<H> {
    pub fn new(registry: NpcRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::with_capacity(registry.records().len()),
            has_scanned: false,
        }
    }

    pub fn has_scanned(&self) -> bool {
        self.has_scanned
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub fn cached_handle(&self, name: &str) -> Option<&H> {
        self.cache.get(name)
    }

    pub fn tick<S, F>(&mut self, scene: &mut S, flags: &F) -> Option<DiscoveryReport>
    where
        S: HandleControl<Handle = H> + ReadinessProbe + ?Sized,
        F: FlagsProvider + ?Sized,
    {
        if self.has_scanned || !scene.is_ready() {
            return None;
        }

        info!("npc_scene_ready");
        let report = self.discover(&*scene);
        self.apply_flag_state(scene, flags);
        Some(report)
    }

    /// `name` is a soul flag or a single NPC name.
    pub fn activate<S, F>(&mut self, scene: &mut S, flags: &F, name: &str)
    where
        S: HandleControl<Handle = H> + ?Sized,
        F: FlagsProvider + ?Sized,
    {
        if !flags.souls_enabled() {
            debug!(npc = name, "npc_activate_skipped_souls_disabled");
            return;
        }

        info!(npc = name, "npc_activate");
        for member in self.registry.expand(name) {
            self.activate_single(scene, member);
        }
    }

    pub fn refresh<S, F>(&self, scene: &mut S, flags: &F)
    where
        S: HandleControl<Handle = H> + ?Sized,
        F: FlagsProvider + ?Sized,
    {
        if !self.has_scanned {
            debug!("npc_refresh_skipped_unscanned");
            return;
        }

        info!(souls_enabled = flags.souls_enabled(), "npc_refresh");
        self.apply_flag_state(scene, flags);
    }

    pub fn reset(&mut self) {
        info!(cached = self.cache.len(), "npc_reset");
        self.has_scanned = false;
        self.cache.clear();
    }

    fn discover<S>(&mut self, scene: &S) -> DiscoveryReport
    where
        S: SceneLookup<Handle = H> + ?Sized,
    {
        let mut report = DiscoveryReport::default();
        if self.has_scanned {
            return report;
        }
        self.has_scanned = true;

        info!(
            npc_count = self.registry.records().len(),
            "npc_discovery_started"
        );
        for record in self.registry.records() {
            match lookup(scene, record) {
                Ok(handle) => {
                    self.cache.insert(record.name, handle);
                    info!(npc = record.name, "npc_found");
                    report.found.push(record.name);
                }
                Err(miss) => {
                    self.cache.remove(record.name);
                    warn!(error = %miss, npc = miss.name, "npc_lookup_miss");
                    report.missing.push(miss);
                }
            }
        }
        info!(
            cached = self.cache.len(),
            missing = report.missing.len(),
            "npc_discovery_finished"
        );
        report
    }

    // Two phases when souls are on: everything off, then back on per held flag.
    fn apply_flag_state<S, F>(&self, scene: &mut S, flags: &F)
    where
        S: HandleControl<Handle = H> + ?Sized,
        F: FlagsProvider + ?Sized,
    {
        if flags.souls_enabled() {
            info!("npc_souls_enabled_disabling_until_received");
            self.set_all_active(scene, false);
            self.apply_states_from_flags(scene, flags);
        } else {
            info!("npc_souls_disabled_enabling_all");
            self.set_all_active(scene, true);
        }
    }

    fn set_all_active<S>(&self, scene: &mut S, active: bool)
    where
        S: HandleControl<Handle = H> + ?Sized,
    {
        for record in self.registry.records() {
            if let Some(handle) = self.cache.get(record.name) {
                scene.set_active(handle, active);
            }
        }
        debug!(active, count = self.cache.len(), "npc_set_all_active");
    }

    fn apply_states_from_flags<S, F>(&self, scene: &mut S, flags: &F)
    where
        S: HandleControl<Handle = H> + ?Sized,
        F: FlagsProvider + ?Sized,
    {
        for group in self.registry.groups() {
            if !flags.has_soul(group.flag) {
                continue;
            }
            for member in group.members {
                if let Some(handle) = self.cache.get(member) {
                    scene.set_active(handle, true);
                    info!(npc = *member, soul = group.flag, "npc_set_active");
                }
            }
        }
    }

    fn activate_single<S>(&mut self, scene: &mut S, name: &str)
    where
        S: HandleControl<Handle = H> + ?Sized,
    {
        if let Some(handle) = self.cache.get(name) {
            scene.set_active(handle, true);
            info!(npc = name, "npc_now_active");
            return;
        }

        let Some(record) = self.registry.record(name) else {
            warn!(npc = name, "npc_unknown");
            return;
        };

        warn!(npc = name, "npc_not_cached_searching");
        match lookup(&*scene, record) {
            Ok(handle) => {
                scene.set_active(&handle, true);
                self.cache.insert(record.name, handle);
                info!(npc = name, "npc_found_and_enabled");
            }
            Err(miss) => {
                warn!(error = %miss, npc = miss.name, "npc_lookup_miss");
            }
        }
    }
}

fn lookup<S>(scene: &S, record: &'static NpcRecord) -> Result<S::Handle, LookupMiss>
where
    S: SceneLookup + ?Sized,
{
    scene
        .find_by_path(record.lookup_path)
        .ok_or(LookupMiss {
            name: record.name,
            path: record.lookup_path,
        })
}
