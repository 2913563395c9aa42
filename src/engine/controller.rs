/// Run controller: one app session from launch to force-stop.
///
/// `Starting` launches the app and waits for it to settle, `Looping` runs
/// capture → recognize → classify/act up to `max_loops` times, and the run
/// ends `Terminal` on a terminal text or `Exhausted` when the budget is
/// spent. Either way the app is stopped and the screenshots are purged.
use std::path::Path;
use std::sync::Arc;

use tracing::Instrument;

use crate::config::{AppConfig, RulesConfig, RunConfig, Variant};
use crate::device::gateway::CommandGateway;
use crate::device::input;
use crate::engine::classifier::{ActionEngine, EngineOutcome};
use crate::engine::loop_control::LoopController;
use crate::engine::rules::ClassificationRules;
use crate::engine::state::{RunExit, RunPhase, RunSession, SessionOutcome, Verdict};
use crate::errors::{AutobuyError, AutobuyResult};
use crate::perception::audit::AuditWriter;
use crate::perception::screenshot::{purge_screenshots, ScreenCapture};
use crate::perception::traits::TextRecognizer;

pub struct RunController {
    gateway: Arc<dyn CommandGateway>,
    recognizer: Arc<dyn TextRecognizer>,
    capture: ScreenCapture,
    audit: Arc<AuditWriter>,
    rules: RulesConfig,
    run: RunConfig,
}

impl RunController {
    pub fn new(
        cfg: &AppConfig,
        gateway: Arc<dyn CommandGateway>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        let capture = ScreenCapture::new(
            gateway.clone(),
            cfg.paths.screenshots_dir.clone(),
            cfg.device.remote_screenshot.clone(),
        );
        Self {
            gateway,
            recognizer,
            capture,
            audit: Arc::new(AuditWriter::new(cfg.paths.marked_dir.clone())),
            rules: cfg.rules.clone(),
            run: cfg.run.clone(),
        }
    }

    pub fn screenshots_dir(&self) -> &Path {
        self.capture.local_dir()
    }

    /// Run one full session. Every call starts from `Starting` with fresh
    /// session state.
    pub async fn run_session(&self, variant: &Variant) -> SessionOutcome {
        let span = tracing::info_span!(
            "session",
            variant = %variant.name,
            session = %uuid::Uuid::new_v4()
        );
        self.drive(variant).instrument(span).await
    }

    async fn drive(&self, variant: &Variant) -> SessionOutcome {
        tracing::info!(phase = ?RunPhase::Starting, package = %variant.package, "session starting");
        if let Err(e) = self.prepare_dirs() {
            tracing::error!(error = %e, "cannot prepare output directories");
            return SessionOutcome::Fatal(e);
        }
        if let Err(e) = input::launch(self.gateway.as_ref(), variant).await {
            tracing::error!(error = %e, "app launch failed");
            return SessionOutcome::Recoverable(e);
        }
        tokio::time::sleep(self.run.launch_settle()).await;

        tracing::info!(phase = ?RunPhase::Looping, max_loops = self.run.max_loops, "entering loop");
        let exit = self.run_loop(variant).await;
        let phase = match exit {
            RunExit::Terminal { .. } => RunPhase::Terminal,
            RunExit::Exhausted { .. } => RunPhase::Exhausted,
        };
        tracing::info!(phase = ?phase, iterations = exit.iterations(), "loop finished");

        if let Err(e) = input::force_stop(self.gateway.as_ref(), variant).await {
            tracing::error!(error = %e, "app force-stop failed");
            return SessionOutcome::Recoverable(e);
        }
        tokio::time::sleep(self.run.stop_settle()).await;

        purge_screenshots(self.screenshots_dir());
        SessionOutcome::Completed(exit)
    }

    fn prepare_dirs(&self) -> AutobuyResult<()> {
        std::fs::create_dir_all(self.screenshots_dir())?;
        std::fs::create_dir_all(self.audit.dir())?;
        Ok(())
    }

    async fn run_loop(&self, variant: &Variant) -> RunExit {
        let engine = ActionEngine::new(
            ClassificationRules::for_variant(&self.rules, variant),
            self.gateway.clone(),
            self.audit.clone(),
            self.run.tap_settle(),
        );
        let mut ctl = LoopController::new(self.run.max_loops);
        let mut session = RunSession::default();

        while let Some(iteration) = ctl.next_iteration() {
            session.loop_index = iteration;
            match self.iterate(&engine).await {
                Ok(outcome) => {
                    session.record(&outcome.verdict, outcome.matched_text.as_deref());
                    let text = outcome.matched_text.as_deref().unwrap_or_default();
                    match &outcome.verdict {
                        Verdict::Terminal => {
                            tracing::info!(
                                iteration = session.loop_index,
                                terminal = session.terminal,
                                text = %text,
                                "purchase limit reached or out of stock; leaving loop"
                            );
                            return RunExit::Terminal {
                                iterations: session.loop_index,
                            };
                        }
                        Verdict::Acted => {
                            tracing::info!(iteration, text = %text, "matched text; waiting for next iteration");
                        }
                        Verdict::NoMatch => {
                            tracing::info!(iteration, "no text matched; continuing");
                        }
                        Verdict::ActionFailed { reason } => {
                            ctl.record_failure();
                            tracing::warn!(iteration, text = %text, reason = %reason, "action failed; continuing");
                        }
                    }
                }
                Err(e) => {
                    ctl.record_failure();
                    tracing::warn!(iteration, error = %e, "iteration skipped");
                }
            }
            tokio::time::sleep(self.run.loop_interval()).await;
        }

        tracing::info!(
            last_iteration = session.loop_index,
            terminal = session.terminal,
            failures = ctl.failures(),
            last_text = ?session.last_matched_text,
            "loop budget exhausted without a terminal condition"
        );
        RunExit::Exhausted {
            iterations: ctl.iterations(),
        }
    }

    /// capture → load → recognize → classify/act. A failed capture never
    /// reaches the recognizer.
    async fn iterate(&self, engine: &ActionEngine) -> AutobuyResult<EngineOutcome> {
        let path = self.capture.capture().await?;
        let frame = image::open(&path)
            .map_err(|e| AutobuyError::Recognition(format!("cannot read {}: {e}", path.display())))?
            .to_rgba8();
        let detections = self.recognizer.recognize(&path).await?;
        tracing::debug!(count = detections.len(), "detections received");
        Ok(engine.process(&detections, frame).await)
    }
}
