//! JSON workflow definition format read by `validate`/`run` (spec §3,
//! §6) — the CLI-level analog of the teacher's JSONB `definition` column
//! shape, generalized from a flat node list to steps with input wiring,
//! retry, timeout, and routing.

use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use workflow_core::{Decider, JobRegistry};
use workflow_engine::{Edge, InputRef, Routing, StepDefinition};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum InputRefFile {
    Global { key: String },
    StepOutput { step_id: String, field: Option<String> },
    Literal { value: Value },
}

impl From<InputRefFile> for InputRef {
    fn from(f: InputRefFile) -> Self {
        match f {
            InputRefFile::Global { key } => InputRef::Global(key),
            InputRefFile::StepOutput { step_id, field } => InputRef::StepOutput { step_id, field },
            InputRefFile::Literal { value } => InputRef::Literal(value),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RetryFile {
    max_attempts: u32,
    #[serde(default)]
    base_delay_seconds: f64,
    #[serde(default = "default_multiplier")]
    multiplier: f64,
    #[serde(default = "default_max_delay_seconds")]
    max_delay_seconds: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_max_delay_seconds() -> f64 {
    60.0
}

#[derive(Debug, Deserialize)]
struct StepFile {
    id: String,
    /// Job class, looked up in the process's [`JobRegistry`] at build
    /// time.
    class: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    inputs: IndexMap<String, InputRefFile>,
    #[serde(default)]
    retry: Option<RetryFile>,
    #[serde(default)]
    timeout_seconds: Option<f64>,
    #[serde(default = "default_stop_on_fail")]
    stop_on_fail: bool,
    #[serde(default)]
    decider: Option<Decider>,
}

fn default_stop_on_fail() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct EdgeFile {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowFile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub globals: Value,
    steps: Vec<StepFile>,
    #[serde(default)]
    edges: Vec<EdgeFile>,
}

impl WorkflowFile {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.edges.iter().map(|e| Edge { from: e.from.clone(), to: e.to.clone() }).collect()
    }

    pub fn step_ids(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.id.clone()).collect()
    }

    /// Build real [`StepDefinition`]s by instantiating each step's job
    /// class through `registry`. Used by `run`/`worker`.
    pub fn build_steps(&self, registry: &JobRegistry) -> anyhow::Result<Vec<StepDefinition>> {
        self.steps
            .iter()
            .map(|s| {
                let descriptor = workflow_core::JobDescriptor { class: s.class.clone(), id: s.id.clone(), data: s.data.clone() };
                let job = registry
                    .instantiate(&descriptor)
                    .map_err(|e| anyhow::anyhow!("step '{}': {e}", s.id))?;
                Ok(to_step_definition(s, job))
            })
            .collect()
    }
}

fn to_step_definition(file: &StepFile, job: std::sync::Arc<dyn workflow_core::Job>) -> StepDefinition {
    let mut step = StepDefinition::new(file.id.clone(), job);
    for (field, source) in &file.inputs {
        step = step.with_input(field.clone(), InputRef::from(source.clone()));
    }
    if let Some(retry) = &file.retry {
        step = step.with_retry(workflow_core::RetryPolicy::new(
            retry.max_attempts,
            retry.base_delay_seconds,
            retry.multiplier,
            retry.max_delay_seconds,
        ));
    }
    if let Some(seconds) = file.timeout_seconds {
        step = step.with_timeout(Duration::from_secs_f64(seconds));
    }
    step = step.with_stop_on_fail(file.stop_on_fail);
    if let Some(decider) = &file.decider {
        step = step.with_routing(Routing::Decide(decider.clone()));
    }
    step
}
