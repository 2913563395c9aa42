// Session retry: rerun a failed session a fixed number of times.
use crate::config::Variant;
use crate::engine::controller::RunController;
use crate::engine::state::{RunExit, SessionOutcome};
use crate::errors::AutobuyError;
use crate::perception::screenshot::purge_screenshots;

#[derive(Debug)]
pub struct RetryReport {
    pub attempts: u32,
    pub result: Result<RunExit, AutobuyError>,
}

impl RetryReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Recoverable failures are retried up to `max_attempts` sessions in total;
/// fatal ones are not. Screenshots are purged after every failed attempt.
pub async fn run_with_retry(
    controller: &RunController,
    variant: &Variant,
    max_attempts: u32,
) -> RetryReport {
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match controller.run_session(variant).await {
            SessionOutcome::Completed(exit) => {
                tracing::info!(variant = %variant.name, attempt, ?exit, "session completed");
                return RetryReport {
                    attempts: attempt,
                    result: Ok(exit),
                };
            }
            SessionOutcome::Recoverable(e) => {
                tracing::error!(variant = %variant.name, attempt, error = %e, "session failed");
                purge_screenshots(controller.screenshots_dir());
                last_error = Some(e);
            }
            SessionOutcome::Fatal(e) => {
                tracing::error!(variant = %variant.name, attempt, error = %e, "session failed; not retrying");
                purge_screenshots(controller.screenshots_dir());
                return RetryReport {
                    attempts: attempt,
                    result: Err(e),
                };
            }
        }
    }

    tracing::error!(variant = %variant.name, max_attempts, "maximum attempts reached; giving up until next trigger");
    RetryReport {
        attempts: max_attempts,
        result: Err(last_error.unwrap_or_else(|| {
            AutobuyError::Config("retry.max_attempts must be at least 1".into())
        })),
    }
}
