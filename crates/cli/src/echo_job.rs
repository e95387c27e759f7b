//! The one built-in job class this binary ships: `echo`, which simply
//! returns its resolved inputs as output. Real domain jobs are expected
//! to register themselves in a [`JobRegistry`] the way the teacher's own
//! `nodes::mock::MockNode` stands in for a real node in its tests; `echo`
//! exists so `run`/`worker` have something to exercise without any such
//! registration.

use async_trait::async_trait;
use serde_json::Value;

use workflow_core::{Job, JobContext, JobDescriptor, JobException, JobOutcome};

pub struct EchoJob {
    id: String,
}

impl EchoJob {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Job for EchoJob {
    async fn run(&self, inputs: Value, _ctx: &JobContext) -> Result<JobOutcome, JobException> {
        Ok(JobOutcome::success(inputs))
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "returns its resolved inputs unchanged"
    }

    fn descriptor(&self) -> Option<JobDescriptor> {
        Some(JobDescriptor { class: "echo".to_string(), id: self.id.clone(), data: None })
    }
}

/// A [`JobRegistry`] pre-populated with `echo`, shared by the `run` and
/// `worker` subcommands so a step marshaled to a worker process can
/// reconstruct the same job the parent process validated against.
pub fn registry() -> workflow_core::JobRegistry {
    let mut registry = workflow_core::JobRegistry::new();
    registry.register("echo", std::sync::Arc::new(|descriptor: &JobDescriptor| Ok(std::sync::Arc::new(EchoJob::new(descriptor.id.clone())) as std::sync::Arc<dyn Job>)));
    registry
}
