use std::process::ExitCode;

use engine::run_app_with_metrics;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        scene,
        metrics,
        images,
    } = app;
    let result = run_app_with_metrics(config, scene, metrics);
    drop(images);

    if let Err(err) = result {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    info!("shutdown_complete");
    ExitCode::SUCCESS
}
