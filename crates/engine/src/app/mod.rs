mod loop_runner;
mod metrics;
mod scene;

pub use loop_runner::{run_headless, LoopConfig, LoopSummary};
pub use scene::{
    Node, NodeHandle, NodeSnapshot, NodeTag, Scene, SceneCommand, SceneGraph, SceneGraphError,
};
