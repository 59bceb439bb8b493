mod bootstrap;
mod call;
mod chat;
mod client;
mod config;
mod hud;
mod loop_runner;
mod net;
mod notifications;
mod office_scene;
mod session;
mod world;


use std::process::ExitCode;

use tracing::error;

pub(crate) fn run() -> ExitCode {
    match bootstrap::build_app() {
        Ok(app) => loop_runner::run(app),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
