//! `workflow-core` — the data model and plug-in contracts shared by the
//! rest of the workspace: `Job`, `Tracker`, `Runner`, the `RetryPolicy`
//! and `Decider` value objects, and the Context snapshot wire format.
//!
//! Nothing here schedules anything; that's `workflow-engine`.

pub mod decider;
pub mod error;
pub mod job;
pub mod job_result;
pub mod record;
pub mod retry;
pub mod runner;
pub mod serialize;
pub mod snapshot;
pub mod testutil;
pub mod tracker;

pub use decider::{Condition, Decider, Operator};
pub use error::StepErrorKind;
pub use job::{Job, JobContext, JobException, JobOutcome};
pub use job_result::{JobResult, JobResultStatus};
pub use record::{ExecutionRecord, StepStatus, WorkflowStatus};
pub use retry::RetryPolicy;
pub use runner::{RunRequest, Runner, StepOutcome};
pub use serialize::{JobDescriptor, JobFactory, JobRegistry, JobRegistryError};
pub use snapshot::{ContextSnapshot, ExecutedJobSnapshot, PerformanceSnapshot, RetrySnapshot, StepPerformanceSnapshot, StepSnapshot};
pub use tracker::{NoopTracker, Tracker};

pub use serde_json::Value;
pub use uuid::Uuid;
