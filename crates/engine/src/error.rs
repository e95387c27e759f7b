//! Engine-level error types.

use thiserror::Error;
use workflow_core::StepErrorKind;

/// Errors produced by the workflow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------
    /// Two or more steps share the same ID.
    #[error("duplicate step ID: '{0}'")]
    DuplicateNodeId(String),

    /// An edge, input reference, or routing target names a step ID that
    /// doesn't exist in the workflow.
    #[error("edge references unknown step '{node_id}' ({side} side)")]
    UnknownNodeReference { node_id: String, side: &'static str },

    /// Topological layering detected a cycle.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    // ------ Execution errors ------
    /// A step exhausted its retry policy; `stop_on_fail` aborted the run.
    #[error("step '{step_id}' exhausted its retry policy: {source}")]
    RetryExhausted {
        step_id: String,
        #[source]
        source: StepErrorKind,
    },

    /// A step's timeout elapsed on every attempt.
    #[error("step '{0}' timed out")]
    StepTimeout(String),

    /// A `Decider` or routing callback named a step id that doesn't exist.
    #[error("routing from step '{from}' named unknown step '{target}'")]
    RoutingError { from: String, target: String },
}
