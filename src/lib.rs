pub mod config;
pub mod device;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod perception;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::device::gateway::AdbGateway;
use crate::engine::controller::RunController;
use crate::errors::AutobuyResult;
use crate::perception::ocr_client::HttpOcrClient;
use crate::scheduler::Scheduler;

/// Process entry: load config, install logging, then run scheduled
/// sessions until the process is terminated.
pub async fn run() -> AutobuyResult<()> {
    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let cfg = config::load_config()?;
    cfg.validate()?;
    logging::init(&cfg.logging, &cfg.paths.log_dir)?;

    std::fs::create_dir_all(&cfg.paths.screenshots_dir)?;
    std::fs::create_dir_all(&cfg.paths.marked_dir)?;

    let gateway = Arc::new(AdbGateway::new(&cfg.device));
    let recognizer = Arc::new(HttpOcrClient::new(&cfg.ocr)?);
    let controller = RunController::new(&cfg, gateway, recognizer);
    let scheduler = Scheduler::new(&cfg, controller);

    tracing::info!(
        variants = ?cfg.variants.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        minute = cfg.schedule.minute,
        hours = ?cfg.schedule.hours,
        ocr = %cfg.ocr.endpoint,
        "autobuy started"
    );
    scheduler.run_forever().await
}
