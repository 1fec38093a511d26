use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

const PATH_SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    ReturnToMenu,
    Quit,
}

/// Weak reference to a node. Resolves only while its slot keeps the same generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl NodeHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTag {
    Goose,
    Npc,
    Prop,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub path: String,
    pub tag: NodeTag,
    pub active: bool,
    applied_spawn_order: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub path: String,
    pub tag: NodeTag,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneGraphError {
    #[error("node path is empty")]
    EmptyPath,
    #[error("node path '{path}' contains an empty segment")]
    EmptySegment { path: String },
    #[error("node path '{path}' is already in use")]
    DuplicatePath { path: String },
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    path_index: HashMap<String, u32>,
    pending_spawns: Vec<(NodeHandle, Node)>,
    pending_despawns: Vec<NodeHandle>,
    next_applied_spawn_order: u64,
}

impl SceneGraph {
    pub fn spawn(&mut self, path: &str, tag: NodeTag) -> Result<NodeHandle, SceneGraphError> {
        validate_path(path)?;
        let pending_clash = self
            .pending_spawns
            .iter()
            .any(|(_, node)| node.path == path);
        if self.path_index.contains_key(path) || pending_clash {
            return Err(SceneGraphError::DuplicatePath {
                path: path.to_string(),
            });
        }

        let handle = self.allocate_slot();
        self.pending_spawns.push((
            handle,
            Node {
                path: path.to_string(),
                tag,
                active: true,
                applied_spawn_order: 0,
            },
        ));
        Ok(handle)
    }

    pub fn despawn(&mut self, handle: NodeHandle) -> bool {
        let exists_now = self.get(handle).is_some();
        let pending_spawn = self
            .pending_spawns
            .iter()
            .any(|(pending, _)| *pending == handle);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(handle);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            let despawns = std::mem::take(&mut self.pending_despawns);
            self.pending_spawns
                .retain(|(handle, _)| !despawns.contains(handle));
            for handle in despawns {
                self.release_slot(handle);
            }
        }

        if !self.pending_spawns.is_empty() {
            for (handle, mut node) in std::mem::take(&mut self.pending_spawns) {
                node.applied_spawn_order = self.next_applied_spawn_order;
                self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
                self.path_index.insert(node.path.clone(), handle.index);
                if let Some(slot) = self.slots.get_mut(handle.index as usize) {
                    slot.node = Some(node);
                }
            }
        }
    }

    /// Removes every node and invalidates every handle handed out so far.
    pub fn clear(&mut self) {
        self.free_slots.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_slots.push(index as u32);
        }
        self.path_index.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
    }

    pub fn find_by_path(&self, path: &str) -> Option<NodeHandle> {
        let index = *self.path_index.get(path)?;
        let slot = self.slots.get(index as usize)?;
        slot.node.as_ref()?;
        Some(NodeHandle {
            index,
            generation: slot.generation,
        })
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Returns `false` when the handle no longer resolves.
    pub fn set_active(&mut self, handle: NodeHandle, active: bool) -> bool {
        match self.get_mut(handle) {
            Some(node) => {
                node.active = active;
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, handle: NodeHandle) -> Option<bool> {
        self.get(handle).map(|node| node.active)
    }

    pub fn is_active_at(&self, path: &str) -> Option<bool> {
        self.find_by_path(path)
            .and_then(|handle| self.is_active(handle))
    }

    pub fn node_count(&self) -> usize {
        self.path_index.len()
    }

    pub fn count_tagged(&self, tag: NodeTag) -> usize {
        self.live_nodes().filter(|node| node.tag == tag).count()
    }

    pub fn goose_count(&self) -> usize {
        self.count_tagged(NodeTag::Goose)
    }

    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        let mut nodes: Vec<&Node> = self.live_nodes().collect();
        nodes.sort_by_key(|node| node.applied_spawn_order);
        nodes
            .into_iter()
            .map(|node| NodeSnapshot {
                path: node.path.clone(),
                tag: node.tag,
                active: node.active,
            })
            .collect()
    }

    fn live_nodes(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().filter_map(|slot| slot.node.as_ref())
    }

    fn allocate_slot(&mut self) -> NodeHandle {
        if let Some(index) = self.free_slots.pop() {
            let generation = self.slots[index as usize].generation;
            return NodeHandle { index, generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot::default());
        NodeHandle {
            index,
            generation: 0,
        }
    }

    fn release_slot(&mut self, handle: NodeHandle) {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return;
        };
        if slot.generation != handle.generation {
            return;
        }
        if let Some(node) = slot.node.take() {
            self.path_index.remove(&node.path);
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(handle.index);
    }
}

fn validate_path(path: &str) -> Result<(), SceneGraphError> {
    if path.is_empty() {
        return Err(SceneGraphError::EmptyPath);
    }
    if path.split(PATH_SEPARATOR).any(|segment| segment.is_empty()) {
        return Err(SceneGraphError::EmptySegment {
            path: path.to_string(),
        });
    }
    Ok(())
}

pub trait Scene {
    fn load(&mut self, graph: &mut SceneGraph);
    fn update(&mut self, tick: u64, fixed_dt_seconds: f32, graph: &mut SceneGraph)
        -> SceneCommand;
    fn unload(&mut self, graph: &mut SceneGraph);
    fn debug_title(&self, _graph: &SceneGraph) -> Option<String> {
        None
    }
}

pub(crate) struct SceneRuntime {
    scene: Box<dyn Scene>,
    graph: SceneGraph,
    is_loaded: bool,
}

impl SceneRuntime {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            graph: SceneGraph::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn load_if_needed(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.graph);
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, tick: u64, fixed_dt_seconds: f32) -> SceneCommand {
        self.scene.update(tick, fixed_dt_seconds, &mut self.graph)
    }

    pub(crate) fn apply_pending(&mut self) {
        self.graph.apply_pending();
    }

    pub(crate) fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.graph)
    }

    pub(crate) fn hard_reset(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.graph);
        }
        self.graph.clear();
        self.scene.load(&mut self.graph);
        self.is_loaded = true;
    }

    pub(crate) fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.graph);
            self.graph.clear();
            self.is_loaded = false;
        }
    }
}
