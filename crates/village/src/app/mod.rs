pub(crate) mod bootstrap;
pub(crate) mod loop_runner;
mod scene_host;
mod script;
mod village_scene;
