use std::env::{self, VarError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::metrics::MetricsAccumulator;
use super::scene::SceneRuntime;
use super::{Scene, SceneCommand};

pub(crate) const MAX_TICKS_ENV_VAR: &str = "SOULS_MAX_TICKS";
pub(crate) const REALTIME_ENV_VAR: &str = "SOULS_REALTIME";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_ticks: u64,
    /// Sleep between ticks so the loop runs at `target_tps` instead of as fast as possible.
    pub realtime: bool,
    pub metrics_log_interval_ticks: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: 600,
            realtime: false,
            metrics_log_interval_ticks: 60,
        }
    }
}

impl LoopConfig {
    /// Applies `SOULS_MAX_TICKS` and `SOULS_REALTIME` on top of this config.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(env::var(MAX_TICKS_ENV_VAR), env::var(REALTIME_ENV_VAR))
    }

    fn with_overrides(
        mut self,
        max_ticks: Result<String, VarError>,
        realtime: Result<String, VarError>,
    ) -> Self {
        self.max_ticks = resolve_max_ticks(max_ticks, self.max_ticks);
        self.realtime = resolve_realtime(realtime, self.realtime);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub session_count: u32,
    pub quit_requested: bool,
}

pub fn run_headless(config: LoopConfig, scene: Box<dyn Scene>) -> LoopSummary {
    let mut runtime = SceneRuntime::new(scene);
    let target_tps = config.target_tps.max(1);
    let max_ticks = config.max_ticks;
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    info!(
        target_tps,
        max_ticks,
        realtime = config.realtime,
        metrics_log_interval_ticks = config.metrics_log_interval_ticks,
        "loop_config"
    );

    runtime.load_if_needed();
    runtime.apply_pending();
    info!(node_count = runtime.graph().node_count(), "scene_loaded");

    let mut summary = LoopSummary {
        ticks: 0,
        session_count: 1,
        quit_requested: false,
    };
    let mut metrics = MetricsAccumulator::new(config.metrics_log_interval_ticks, Instant::now());
    let mut last_title: Option<String> = None;

    for tick in 0..max_ticks {
        let tick_started = Instant::now();
        let command = runtime.update(tick, fixed_dt_seconds);
        runtime.apply_pending();
        summary.ticks = summary.ticks.saturating_add(1);

        match command {
            SceneCommand::None => {}
            SceneCommand::ReturnToMenu => {
                runtime.hard_reset();
                runtime.apply_pending();
                summary.session_count = summary.session_count.saturating_add(1);
                info!(
                    tick,
                    session = summary.session_count,
                    node_count = runtime.graph().node_count(),
                    "session_restarted"
                );
            }
            SceneCommand::Quit => {
                summary.quit_requested = true;
                info!(tick, reason = "scene_quit", "shutdown_requested");
                break;
            }
        }

        let next_title = runtime.debug_title();
        if next_title != last_title {
            if let Some(title) = &next_title {
                info!(tick, title = title.as_str(), "scene_title");
            }
            last_title = next_title;
        }

        let tick_dt = Instant::now().saturating_duration_since(tick_started);
        metrics.record_tick(tick_dt);
        if let Some(snapshot) = metrics.maybe_snapshot(Instant::now()) {
            info!(
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                interval_ticks = snapshot.ticks,
                node_count = runtime.graph().node_count(),
                "loop_metrics"
            );
        }

        if config.realtime {
            let pacing_sleep = compute_pacing_sleep(tick_dt, fixed_dt);
            if pacing_sleep > Duration::ZERO {
                thread::sleep(pacing_sleep);
            }
        }
    }

    runtime.shutdown();
    info!(
        ticks = summary.ticks,
        sessions = summary.session_count,
        quit_requested = summary.quit_requested,
        "shutdown"
    );
    summary
}

fn compute_pacing_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

fn resolve_max_ticks(value: Result<String, VarError>, config_max_ticks: u64) -> u64 {
    match value {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(ticks) => ticks,
            Err(_) => {
                warn!(
                    env_var = MAX_TICKS_ENV_VAR,
                    value = value.as_str(),
                    "invalid max-ticks env var value; falling back to config"
                );
                config_max_ticks
            }
        },
        Err(VarError::NotPresent) => config_max_ticks,
        Err(err) => {
            warn!(
                env_var = MAX_TICKS_ENV_VAR,
                error = %err,
                "unable to read max-ticks env var; falling back to config"
            );
            config_max_ticks
        }
    }
}

fn resolve_realtime(value: Result<String, VarError>, config_realtime: bool) -> bool {
    match value {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!(
                    env_var = REALTIME_ENV_VAR,
                    value = value.as_str(),
                    "invalid realtime env var value; falling back to config"
                );
                config_realtime
            }
        },
        Err(VarError::NotPresent) => config_realtime,
        Err(err) => {
            warn!(
                env_var = REALTIME_ENV_VAR,
                error = %err,
                "unable to read realtime env var; falling back to config"
            );
            config_realtime
        }
    }
}
