mod bootstrap;
mod demo_content;
mod gameplay;
mod headless;
mod hud;
mod loop_runner;
mod pause;

use std::process::ExitCode;

use tracing::error;

pub(crate) const GAMEPLAY_SCENE: &str = "gameplay";
pub(crate) const HUD_SCENE: &str = "hud";
pub(crate) const PAUSE_SCENE: &str = "pause";

/// Latest-value key carrying the HUD's inventory line.
pub(crate) const INVENTORY_TEXT_KEY: &str = "inventory";
pub(crate) const SAVE_REQUESTED_KEY: &str = "save_requested";
pub(crate) const LOAD_REQUESTED_KEY: &str = "load_requested";

pub(crate) fn run() -> ExitCode {
    bootstrap::init_tracing();
    match bootstrap::build_app() {
        Ok(app) => loop_runner::run(app),
        Err(error) => {
            error!(error = %error, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
