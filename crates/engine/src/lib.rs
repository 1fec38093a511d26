pub mod app;
mod snapshot;

pub use app::{
    run_headless, LoopConfig, LoopSummary, Node, NodeHandle, NodeSnapshot, NodeTag, Scene,
    SceneCommand, SceneGraph, SceneGraphError,
};
pub use snapshot::{write_snapshot_atomic, SnapshotError};
