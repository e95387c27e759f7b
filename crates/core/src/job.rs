//! The `Job` contract — the single plug-in point this engine depends on.
//!
//! A job is a pure functional unit: given an ordered mapping of named
//! inputs and a read-only view of the running workflow, it returns an
//! output mapping. See the "cyclic object graph" design note: `JobContext`
//! is a snapshot handed in per call, never a back-reference the job can
//! retain across executions.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::serialize::JobDescriptor;

/// Read-only view of the workflow passed into [`Job::run`] for the
/// duration of a single call.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub workflow_id: Uuid,
    pub step_id: String,
    /// The workflow's resolved globals map.
    pub globals: Value,
    /// `{stepId: output}` for every step that has completed so far.
    pub results: Value,
}

/// What a job produced during one `run` call.
///
/// A non-empty `errors` collection is treated as failure even though no
/// exception was raised (spec §3, "Job").
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    pub output: Value,
    pub logs: Vec<String>,
    pub errors: Vec<String>,
}

impl JobOutcome {
    pub fn success(output: Value) -> Self {
        Self {
            output,
            logs: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A job raised instead of returning normally (`JOB_EXCEPTION`).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct JobException(pub String);

/// The contract every domain job must fulfil.
///
/// Exceptions-for-control-flow from the source are replaced by an explicit
/// outcome value per the "exceptions for control flow" design note:
/// `Ok(JobOutcome)` with a non-empty `errors` is `JOB_REPORTED_ERROR`,
/// `Err(JobException)` is `JOB_EXCEPTION`. Both are retried identically by
/// the scheduler.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self, inputs: Value, ctx: &JobContext) -> Result<JobOutcome, JobException>;

    /// Stable identity used by the out-of-process worker's job registry.
    fn id(&self) -> &str;

    /// Declared name; takes precedence over the runtime step id when a
    /// snapshot reports a job name (spec §6, "Job metadata").
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Serialization contract for the out-of-process runner (spec §4.F,
    /// §6): `None` (the default) means this job can only run inline.
    /// Jobs meant to cross the worker-process boundary override this
    /// with their `{class, id, data}` descriptor.
    fn descriptor(&self) -> Option<JobDescriptor> {
        None
    }
}
