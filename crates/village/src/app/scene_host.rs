use engine::{NodeHandle, SceneGraph};
use npc_souls::{HandleControl, ReadinessProbe, SceneLookup};
use tracing::warn;

/// Exposes a [`SceneGraph`] to the visibility manager for the duration of one call.
pub(crate) struct SceneGraphHost<'a> {
    graph: &'a mut SceneGraph,
}

impl<'a> SceneGraphHost<'a> {
    pub(crate) fn new(graph: &'a mut SceneGraph) -> Self {
        Self { graph }
    }
}

impl SceneLookup for SceneGraphHost<'_> {
    type Handle = NodeHandle;

    fn find_by_path(&self, path: &str) -> Option<NodeHandle> {
        self.graph.find_by_path(path)
    }
}

impl HandleControl for SceneGraphHost<'_> {
    fn set_active(&mut self, handle: &NodeHandle, active: bool) {
        if !self.graph.set_active(*handle, active) {
            warn!(
                index = handle.index(),
                generation = handle.generation(),
                active,
                "stale_node_handle"
            );
        }
    }
}

impl ReadinessProbe for SceneGraphHost<'_> {
    // The village counts as loaded once the geese exist.
    fn is_ready(&self) -> bool {
        self.graph.goose_count() > 0
    }
}
