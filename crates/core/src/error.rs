//! The error taxonomy shared across the workspace (spec §7).
//!
//! `StepErrorKind` is not "the" error type for any one crate — it is the
//! *kind* every per-attempt failure is tagged with, so a scheduler can
//! decide retry/stop-on-fail behaviour without matching on message text.
//! `CYCLE_DETECTED` and `TRACKER_FAILURE` are deliberately absent: neither
//! one is a per-attempt step failure (the former never aborts a run, the
//! latter never even reaches the scheduler).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepErrorKind {
    #[error("input validation rejected the resolved inputs: {0}")]
    InputValidation(String),

    #[error("job raised during execution: {0}")]
    JobException(String),

    #[error("job returned normally but reported errors: {0}")]
    JobReportedError(String),

    #[error("step timed out")]
    Timeout,

    #[error("routing callback named a step that does not exist: '{0}'")]
    UnknownRoute(String),
}

impl StepErrorKind {
    /// The message recorded into `ExecutionRecord::errors`.
    pub fn message(&self) -> String {
        self.to_string()
    }
}
