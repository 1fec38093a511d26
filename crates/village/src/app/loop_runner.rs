use std::process::ExitCode;

use engine::run_headless;
use tracing::{info, warn};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let summary = run_headless(app.config, app.scene);
    if summary.quit_requested {
        info!(
            ticks = summary.ticks,
            sessions = summary.session_count,
            "session_finished"
        );
    } else {
        warn!(ticks = summary.ticks, "tick_budget_exhausted_before_quit");
    }

    ExitCode::SUCCESS
}
