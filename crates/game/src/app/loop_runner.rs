use std::process::ExitCode;

use engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(mut app: AppWiring) -> ExitCode {
    match run_app(&app.config, &mut app.runtime, &mut app.platform) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                ticks = summary.ticks,
                clamped_frames = summary.clamped_frames,
                "session_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "session_failed");
            ExitCode::FAILURE
        }
    }
}
