use std::path::PathBuf;

use engine::{write_snapshot_atomic, NodeHandle, NodeTag, Scene, SceneCommand, SceneGraph};
use npc_souls::{FlagsProvider, NpcRegistry, SoulFlags, VisibilityManager};
use tracing::{debug, info, warn};

use super::scene_host::SceneGraphHost;
use super::script::{ScriptError, ScriptEvent, SessionScript, TimedEvent};

const GOOSE_PATH: &str = "geese/goose";
const PROP_PATHS: [&str; 2] = [
    "boilerRoom/ObjectManager/GeneratedGroups/props/golden bell",
    "boilerRoom/ObjectManager/GeneratedGroups/props/timber handle",
];

pub(crate) struct VillageScene {
    registry: NpcRegistry,
    script: SessionScript,
    events: Vec<TimedEvent>,
    next_event: usize,
    flags: SoulFlags,
    npcs: VisibilityManager<NodeHandle>,
    session_start_tick: Option<u64>,
    geese_spawned: bool,
    late_spawned: Vec<String>,
    last_tick: u64,
    dump_path: Option<PathBuf>,
}

impl VillageScene {
    pub(crate) fn new(
        registry: NpcRegistry,
        script: SessionScript,
        dump_path: Option<PathBuf>,
    ) -> Result<Self, ScriptError> {
        script.validate(&registry)?;
        let flags = script.settings.build_flags(&registry)?;
        let events = script.sorted_events();
        Ok(Self {
            registry,
            script,
            events,
            next_event: 0,
            flags,
            npcs: VisibilityManager::new(registry),
            session_start_tick: None,
            geese_spawned: false,
            late_spawned: Vec::new(),
            last_tick: 0,
            dump_path,
        })
    }

    #[cfg(test)]
    pub(crate) fn flags(&self) -> &SoulFlags {
        &self.flags
    }

    #[cfg(test)]
    pub(crate) fn npcs(&self) -> &VisibilityManager<NodeHandle> {
        &self.npcs
    }

    fn advance_loading(&mut self, session_tick: u64, graph: &mut SceneGraph) {
        if !self.geese_spawned && session_tick >= self.script.load_ticks {
            spawn_node(graph, GOOSE_PATH, NodeTag::Goose);
            self.geese_spawned = true;
            info!(session_tick, "geese_spawned");
        }

        for late in &self.script.late_npcs {
            if session_tick < late.after_ticks || self.late_spawned.contains(&late.name) {
                continue;
            }
            if let Some(path) = self.registry.lookup_path(&late.name) {
                spawn_node(graph, path, NodeTag::Npc);
                info!(npc = late.name.as_str(), session_tick, "late_npc_spawned");
            }
            self.late_spawned.push(late.name.clone());
        }
    }

    fn run_due_events(&mut self, tick: u64, graph: &mut SceneGraph) -> SceneCommand {
        while let Some(timed) = self.events.get(self.next_event) {
            if timed.tick > tick {
                break;
            }
            let event = timed.event.clone();
            self.next_event += 1;

            let command = self.dispatch(&event, graph);
            if command != SceneCommand::None {
                return command;
            }
        }
        SceneCommand::None
    }

    fn dispatch(&mut self, event: &ScriptEvent, graph: &mut SceneGraph) -> SceneCommand {
        match event {
            ScriptEvent::ReceiveItem { item } => {
                match self.flags.receive_item(&self.registry, item) {
                    Some(group) => {
                        info!(item = item.as_str(), soul = group.flag, "soul_received");
                        let mut host = SceneGraphHost::new(graph);
                        self.npcs.activate(&mut host, &self.flags, group.flag);
                    }
                    None => warn!(item = item.as_str(), "unknown_soul_item"),
                }
                SceneCommand::None
            }
            ScriptEvent::SetSoulsEnabled { enabled } => {
                self.flags.set_souls_enabled(*enabled);
                info!(enabled = *enabled, "souls_setting_changed");
                self.npcs
                    .refresh(&mut SceneGraphHost::new(graph), &self.flags);
                SceneCommand::None
            }
            ScriptEvent::Reconnect => {
                info!("reconnected");
                self.npcs
                    .refresh(&mut SceneGraphHost::new(graph), &self.flags);
                SceneCommand::None
            }
            ScriptEvent::ReturnToMenu => {
                info!("return_to_menu");
                SceneCommand::ReturnToMenu
            }
            ScriptEvent::Quit => SceneCommand::Quit,
        }
    }

    fn active_npc_names(&self, graph: &SceneGraph) -> Vec<&'static str> {
        self.registry
            .records()
            .iter()
            .filter(|record| graph.is_active_at(record.lookup_path) == Some(true))
            .map(|record| record.name)
            .collect()
    }

    fn log_visibility_summary(&self, graph: &SceneGraph) {
        for record in self.registry.records() {
            let state = match graph.is_active_at(record.lookup_path) {
                Some(true) => "active",
                Some(false) => "inactive",
                None => "absent",
            };
            debug!(npc = record.name, state, "npc_visibility");
        }
        let active = self.active_npc_names(graph);
        info!(
            active_count = active.len(),
            active = %active.join(","),
            souls_enabled = self.flags.souls_enabled(),
            "visibility_summary"
        );
    }
}

impl Scene for VillageScene {
    fn load(&mut self, graph: &mut SceneGraph) {
        self.session_start_tick = None;
        self.geese_spawned = false;
        self.late_spawned.clear();

        for record in self.registry.records() {
            if self.script.is_missing(record.name) || self.script.is_late(record.name) {
                debug!(npc = record.name, "npc_withheld");
                continue;
            }
            spawn_node(graph, record.lookup_path, NodeTag::Npc);
        }
        for path in PROP_PATHS {
            spawn_node(graph, path, NodeTag::Prop);
        }
        info!(
            souls_enabled = self.flags.souls_enabled(),
            load_ticks = self.script.load_ticks,
            "village_loaded"
        );
    }

    fn update(
        &mut self,
        tick: u64,
        _fixed_dt_seconds: f32,
        graph: &mut SceneGraph,
    ) -> SceneCommand {
        self.last_tick = tick;
        let session_start = *self.session_start_tick.get_or_insert(tick);
        let session_tick = tick.saturating_sub(session_start);
        self.advance_loading(session_tick, graph);

        {
            let mut host = SceneGraphHost::new(graph);
            if let Some(report) = self.npcs.tick(&mut host, &self.flags) {
                info!(
                    found = report.found.len(),
                    missing = report.missing.len(),
                    session_tick,
                    "npc_scan_complete"
                );
            }
        }

        self.run_due_events(tick, graph)
    }

    fn unload(&mut self, graph: &mut SceneGraph) {
        self.log_visibility_summary(graph);
        if let Some(path) = &self.dump_path {
            match write_snapshot_atomic(path, self.last_tick, &graph.snapshot()) {
                Ok(()) => info!(path = %path.display(), "snapshot_written"),
                Err(error) => warn!(error = %error, "snapshot_write_failed"),
            }
        }
        self.npcs.reset();
    }

    fn debug_title(&self, graph: &SceneGraph) -> Option<String> {
        if !self.npcs.has_scanned() {
            return Some("village loading".to_string());
        }
        Some(format!(
            "village: {} of {} npcs active",
            self.active_npc_names(graph).len(),
            self.registry.records().len()
        ))
    }
}

fn spawn_node(graph: &mut SceneGraph, path: &str, tag: NodeTag) {
    if let Err(error) = graph.spawn(path, tag) {
        warn!(error = %error, path, "node_spawn_failed");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use engine::{run_headless, LoopConfig};
    use npc_souls::GOOSE_VILLAGE;
    use tempfile::TempDir;

    use super::*;
    use crate::app::script::{default_script, LateNpc};

    const DT: f32 = 1.0 / 60.0;

    fn script(load_ticks: u64, events: Vec<TimedEvent>) -> SessionScript {
        let mut script = default_script();
        script.settings.starting_souls.clear();
        script.load_ticks = load_ticks;
        script.missing_npcs.clear();
        script.late_npcs.clear();
        script.events = events;
        script
    }

    fn at(tick: u64, event: ScriptEvent) -> TimedEvent {
        TimedEvent { tick, event }
    }

    fn receive(item: &str) -> ScriptEvent {
        ScriptEvent::ReceiveItem {
            item: item.to_string(),
        }
    }

    fn loaded(script: SessionScript) -> (VillageScene, SceneGraph) {
        let mut scene = VillageScene::new(GOOSE_VILLAGE, script, None).expect("scene");
        let mut graph = SceneGraph::default();
        scene.load(&mut graph);
        graph.apply_pending();
        (scene, graph)
    }

    fn run_ticks(
        scene: &mut VillageScene,
        graph: &mut SceneGraph,
        ticks: std::ops::Range<u64>,
    ) -> Vec<(u64, SceneCommand)> {
        let mut commands = Vec::new();
        for tick in ticks {
            let command = scene.update(tick, DT, graph);
            graph.apply_pending();
            if command != SceneCommand::None {
                commands.push((tick, command));
            }
        }
        commands
    }

    fn active(scene: &VillageScene, graph: &SceneGraph) -> Vec<&'static str> {
        scene.active_npc_names(graph)
    }

    #[test]
    fn npcs_stay_visible_until_the_geese_load() {
        let (mut scene, mut graph) = loaded(script(3, Vec::new()));

        run_ticks(&mut scene, &mut graph, 0..3);
        assert!(!scene.npcs().has_scanned());
        assert_eq!(active(&scene, &graph).len(), 12);

        run_ticks(&mut scene, &mut graph, 3..5);
        assert!(scene.npcs().has_scanned());
        assert_eq!(scene.npcs().cached_count(), 12);
        assert!(active(&scene, &graph).is_empty());
    }

    #[test]
    fn starting_souls_survive_the_initial_scan() {
        let mut script = script(0, Vec::new());
        script.settings.starting_souls = vec!["Market Lady Soul".to_string()];
        let (mut scene, mut graph) = loaded(script);

        run_ticks(&mut scene, &mut graph, 0..2);

        assert_eq!(active(&scene, &graph), vec!["MarketLady"]);
    }

    #[test]
    fn souls_disabled_keeps_everyone_visible() {
        let mut script = script(0, vec![at(4, receive("Cook Soul"))]);
        script.settings.include_npc_souls = false;
        let (mut scene, mut graph) = loaded(script);

        run_ticks(&mut scene, &mut graph, 0..6);

        assert!(scene.npcs().has_scanned());
        assert_eq!(active(&scene, &graph).len(), 12);
        assert!(scene.flags().has_soul("Cook"));
    }

    #[test]
    fn received_soul_activates_its_npcs() {
        let (mut scene, mut graph) = loaded(script(
            0,
            vec![at(3, receive("Boy Soul")), at(4, receive("Fancy Ladies Soul"))],
        ));

        run_ticks(&mut scene, &mut graph, 0..4);
        assert_eq!(active(&scene, &graph), vec!["Boy"]);

        run_ticks(&mut scene, &mut graph, 4..5);
        assert_eq!(
            active(&scene, &graph),
            vec!["Boy", "FancyLadies1", "FancyLadies2"]
        );
    }

    #[test]
    fn late_npc_is_discovered_when_its_soul_arrives() {
        let mut script = script(0, vec![at(8, receive("Cook Soul"))]);
        script.late_npcs = vec![LateNpc {
            name: "Cook".to_string(),
            after_ticks: 5,
        }];
        let (mut scene, mut graph) = loaded(script);

        run_ticks(&mut scene, &mut graph, 0..3);
        assert!(scene.npcs().has_scanned());
        assert!(!scene.npcs().is_cached("Cook"));

        run_ticks(&mut scene, &mut graph, 3..9);
        assert!(scene.npcs().is_cached("Cook"));
        assert_eq!(active(&scene, &graph), vec!["Cook"]);
    }

    #[test]
    fn missing_npc_soul_is_harmless() {
        let mut script = script(0, vec![at(2, receive("Old Man Soul"))]);
        script.missing_npcs = vec!["OldMan".to_string()];
        let (mut scene, mut graph) = loaded(script);

        let commands = run_ticks(&mut scene, &mut graph, 0..4);

        assert!(commands.is_empty());
        assert_eq!(scene.npcs().cached_count(), 11);
        assert!(!scene.npcs().is_cached("OldMan"));
        assert!(scene.flags().has_soul("OldMan"));
        assert!(active(&scene, &graph).is_empty());
    }

    #[test]
    fn unknown_item_is_ignored() {
        let (mut scene, mut graph) = loaded(script(0, vec![at(2, receive("Golden Bell Soul"))]));

        run_ticks(&mut scene, &mut graph, 0..3);

        assert_eq!(scene.flags().possessed().count(), 0);
        assert!(active(&scene, &graph).is_empty());
    }

    #[test]
    fn souls_toggle_refreshes_from_live_flags() {
        let (mut scene, mut graph) = loaded(script(
            0,
            vec![
                at(2, receive("Pub Lady Soul")),
                at(3, ScriptEvent::SetSoulsEnabled { enabled: false }),
                at(5, ScriptEvent::SetSoulsEnabled { enabled: true }),
            ],
        ));

        run_ticks(&mut scene, &mut graph, 0..4);
        assert_eq!(active(&scene, &graph).len(), 12);

        run_ticks(&mut scene, &mut graph, 4..6);
        assert_eq!(active(&scene, &graph), vec!["PubLady"]);
    }

    #[test]
    fn reconnect_reapplies_state() {
        let (mut scene, mut graph) = loaded(script(0, vec![at(3, ScriptEvent::Reconnect)]));
        run_ticks(&mut scene, &mut graph, 0..2);
        let handle = graph
            .find_by_path(GOOSE_VILLAGE.lookup_path("Cook").expect("path"))
            .expect("cook node");
        graph.set_active(handle, true);

        run_ticks(&mut scene, &mut graph, 2..4);

        assert!(active(&scene, &graph).is_empty());
    }

    #[test]
    fn return_to_menu_resets_and_rediscovers() {
        let (mut scene, mut graph) = loaded(script(
            1,
            vec![
                at(2, receive("Groundskeeper Soul")),
                at(3, ScriptEvent::ReturnToMenu),
            ],
        ));

        let commands = run_ticks(&mut scene, &mut graph, 0..4);
        assert_eq!(commands, vec![(3, SceneCommand::ReturnToMenu)]);
        let old_handle = *scene
            .npcs()
            .cached_handle("Groundskeeper")
            .expect("cached before reset");

        scene.unload(&mut graph);
        graph.clear();
        scene.load(&mut graph);
        graph.apply_pending();
        assert!(!scene.npcs().has_scanned());
        assert_eq!(scene.npcs().cached_count(), 0);

        run_ticks(&mut scene, &mut graph, 4..7);
        let new_handle = *scene
            .npcs()
            .cached_handle("Groundskeeper")
            .expect("cached after rescan");
        assert_ne!(old_handle, new_handle);
        assert_eq!(active(&scene, &graph), vec!["Groundskeeper"]);
    }

    #[test]
    fn unload_writes_snapshot_when_configured() {
        let temp = TempDir::new().expect("tempdir");
        let dump = temp.path().join("scene.json");
        let mut scene =
            VillageScene::new(GOOSE_VILLAGE, script(0, Vec::new()), Some(dump.clone()))
                .expect("scene");
        let mut graph = SceneGraph::default();
        scene.load(&mut graph);
        graph.apply_pending();
        run_ticks(&mut scene, &mut graph, 0..3);

        scene.unload(&mut graph);

        let raw = fs::read_to_string(&dump).expect("snapshot written");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["tick"], 2);
        let nodes = value["nodes"].as_array().expect("nodes");
        assert_eq!(nodes.len(), 12 + PROP_PATHS.len() + 1);
    }

    #[test]
    fn default_script_runs_headless_to_quit() {
        let scene = VillageScene::new(GOOSE_VILLAGE, default_script(), None).expect("scene");
        let config = LoopConfig {
            max_ticks: 1_000,
            ..LoopConfig::default()
        };

        let summary = run_headless(config, Box::new(scene));

        assert!(summary.quit_requested);
        assert_eq!(summary.ticks, 401);
        assert_eq!(summary.session_count, 2);
    }

    #[test]
    fn title_counts_active_npcs_against_the_whole_registry() {
        let mut script = script(0, Vec::new());
        script.settings.include_npc_souls = false;
        script.missing_npcs = vec!["OldMan".to_string()];
        script.late_npcs = vec![LateNpc {
            name: "Cook".to_string(),
            after_ticks: 5,
        }];
        let (mut scene, mut graph) = loaded(script);
        assert_eq!(
            scene.debug_title(&graph),
            Some("village loading".to_string())
        );

        run_ticks(&mut scene, &mut graph, 0..8);

        assert!(!scene.npcs().is_cached("Cook"));
        assert_eq!(
            scene.debug_title(&graph),
            Some("village: 11 of 12 npcs active".to_string())
        );
    }

    #[test]
    fn invalid_script_is_rejected_up_front() {
        let mut script = script(0, Vec::new());
        script.settings.starting_souls = vec!["Timber Handle Soul".to_string()];

        assert!(matches!(
            VillageScene::new(GOOSE_VILLAGE, script, None),
            Err(ScriptError::Settings(_))
        ));
    }
}
