//! `Workflow` — the fluent façade over Context + Scheduler (spec §4.H).
//!
//! Grounded on the teacher's `ExecutorConfig`/`WorkflowExecutor::new`
//! constructor plus the consuming-builder style (`with_max_execution_time`,
//! `with_max_retries`) seen in the reference workflow-engine example: every
//! `with_*`/`add_*` method takes and returns `self` by value.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use workflow_core::{ContextSnapshot, NoopTracker, Runner, Tracker};

use crate::context::Context;
use crate::dag::compute_layers;
use crate::error::EngineError;
use crate::models::{Edge, StepDefinition};
use crate::scheduler::{Scheduler, SchedulerConfig};

/// Outcome of a completed [`Workflow::run`]: the scheduler's result and
/// the final snapshot, regardless of whether the run succeeded — callers
/// that just want "did it work" can match on `result`, callers that want
/// a report (e.g. the CLI's `run` subcommand) always get a snapshot.
pub struct WorkflowRunOutcome {
    pub result: Result<(), EngineError>,
    pub snapshot: ContextSnapshot,
}

pub struct Workflow {
    name: String,
    description: Option<String>,
    steps: Vec<StepDefinition>,
    edges: Vec<Edge>,
    globals: Value,
    tracker: Arc<dyn Tracker>,
    runner: Arc<dyn Runner>,
    config: SchedulerConfig,
}

impl Workflow {
    pub fn new(name: impl Into<String>, runner: Arc<dyn Runner>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
            edges: Vec::new(),
            globals: Value::Object(serde_json::Map::new()),
            tracker: Arc::new(NoopTracker),
            runner,
            config: SchedulerConfig::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_globals(mut self, globals: Value) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.config.max_parallelism = Some(max_parallelism);
        self
    }

    pub fn add_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn connect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge { from: from.into(), to: to.into() });
        self
    }

    /// Validate the graph without running it — used by the CLI's
    /// `validate` subcommand and before every `run`.
    pub fn validate(&self) -> Result<(), EngineError> {
        compute_layers(&self.steps, &self.edges).map(|_| ())
    }

    pub async fn run(self) -> Result<WorkflowRunOutcome, EngineError> {
        self.validate()?;

        let workflow_id = Uuid::new_v4();
        let context = Context::new(
            workflow_id,
            self.name.clone(),
            self.description.clone(),
            self.globals.clone(),
            &self.steps,
            &self.edges,
            self.tracker.clone(),
        );

        let scheduler = Scheduler::new(self.runner.clone(), self.config.clone());
        let result = scheduler.run(self.steps, self.edges, context.clone()).await;
        let snapshot = context.snapshot().await;

        Ok(WorkflowRunOutcome { result, snapshot })
    }
}
