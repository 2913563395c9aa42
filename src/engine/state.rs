use serde::Serialize;

use crate::errors::AutobuyError;

/// Result of one classification pass over a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// A terminal text was seen; no tap was made.
    Terminal,
    /// Exactly one tap was dispatched.
    Acted,
    /// Nothing on the frame matched a rule.
    NoMatch,
    /// A rule matched but the tap command failed.
    ActionFailed { reason: String },
}

/// Phases of the run controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Starting,
    Looping,
    Terminal,
    Exhausted,
}

/// How a completed session left the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunExit {
    /// Stopped on a terminal text.
    Terminal { iterations: u32 },
    /// Loop budget consumed without a terminal text. Not a failure.
    Exhausted { iterations: u32 },
}

impl RunExit {
    pub fn iterations(&self) -> u32 {
        match self {
            RunExit::Terminal { iterations } | RunExit::Exhausted { iterations } => *iterations,
        }
    }
}

/// What `run_session` hands to the retry wrapper.
#[derive(Debug)]
pub enum SessionOutcome {
    Completed(RunExit),
    /// Worth another attempt (device command failures on start/stop).
    Recoverable(AutobuyError),
    /// Retrying cannot help (local filesystem or setup problems).
    Fatal(AutobuyError),
}

/// Mutable bookkeeping for one session; discarded when the loop exits.
#[derive(Debug, Clone, Default)]
pub struct RunSession {
    pub loop_index: u32,
    pub last_matched_text: Option<String>,
    pub terminal: bool,
}

impl RunSession {
    pub fn record(&mut self, verdict: &Verdict, matched_text: Option<&str>) {
        if let Some(text) = matched_text {
            self.last_matched_text = Some(text.to_string());
        }
        if *verdict == Verdict::Terminal {
            self.terminal = true;
        }
    }
}
