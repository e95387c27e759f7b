//! Scheduler — the engine's single driving task (spec §4.G, §5).
//!
//! Generalizes the teacher's `dag::validate_dag` (kept in [`crate::dag`])
//! plus `executor::WorkflowExecutor::run`'s retry loop: layers run
//! strictly in sequence, each layer's still-due steps are handed to the
//! configured [`Runner`] as one batch per retry round, and a completed
//! step's output decides which of its successors actually activate
//! (static fan-out, or a [`Decider`]/routing callback when the step
//! declares one).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use workflow_core::{
    ExecutionRecord, JobContext, JobResult, Runner, RunRequest, StepErrorKind, StepOutcome, StepStatus, WorkflowStatus,
};

use crate::context::Context;
use crate::dag::compute_layers;
use crate::error::EngineError;
use crate::models::{Edge, InputRef, Routing, StepDefinition};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on concurrently-running steps within one layer. `None`
    /// means "as many as the layer contains" — the Runner may still
    /// impose its own ceiling.
    pub max_parallelism: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_parallelism: None }
    }
}

enum Terminal {
    Success,
    Fail,
    Skipped,
}

pub struct Scheduler {
    runner: Arc<dyn Runner>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn Runner>, config: SchedulerConfig) -> Self {
        Self { runner, config }
    }

    /// Run every step of the graph to completion (or to the first
    /// stop-on-fail abort). `context` must have been constructed from the
    /// same `steps`/`edges` pair.
    #[instrument(skip(self, steps, edges, context), fields(workflow_id = %context.workflow_id()))]
    pub async fn run(&self, steps: Vec<StepDefinition>, edges: Vec<Edge>, context: Context) -> Result<(), EngineError> {
        let layers = compute_layers(&steps, &edges)?;

        let all_edges = union_edges(&steps, &edges);
        let mut predecessors: HashMap<String, Vec<String>> = HashMap::new();
        for step in &steps {
            predecessors.entry(step.id.clone()).or_default();
        }
        for edge in &all_edges {
            predecessors.entry(edge.to.clone()).or_default().push(edge.from.clone());
        }

        let step_map: HashMap<String, StepDefinition> = steps.into_iter().map(|s| (s.id.clone(), s)).collect();

        context.start().await;

        let mut terminal: HashMap<String, Terminal> = HashMap::new();
        let mut activated: HashSet<String> = HashSet::new();
        for (id, preds) in &predecessors {
            if preds.is_empty() {
                activated.insert(id.clone());
            }
        }

        let mut abort: Option<EngineError> = None;

        for layer in &layers {
            if abort.is_some() {
                break;
            }

            let ready: Vec<String> = layer
                .iter()
                .filter(|id| !terminal.contains_key(*id))
                .filter(|id| predecessors[*id].iter().all(|p| terminal.contains_key(p)))
                .cloned()
                .collect();

            let mut to_run = Vec::new();
            for id in ready {
                if activated.contains(&id) {
                    to_run.push(id);
                } else {
                    info!(step_id = %id, "skipping step: not reached by any activated edge");
                    terminal.insert(id.clone(), Terminal::Skipped);
                    let mut record = ExecutionRecord::pending();
                    record.status = StepStatus::Skipped;
                    record.skip_reason = Some("no activated predecessor routed to this step".into());
                    context.record_step(&id, record).await;
                }
            }

            if to_run.is_empty() {
                continue;
            }

            let outcomes = self.run_layer(&to_run, &step_map, &context).await;

            for (id, outcome) in outcomes {
                let step = &step_map[&id];
                match outcome {
                    Ok(output) => {
                        terminal.insert(id.clone(), Terminal::Success);
                        match route(step, &output) {
                            Ok(Some(target)) => {
                                if step_map.contains_key(&target) {
                                    activated.insert(target);
                                } else if step.stop_on_fail {
                                    abort = Some(EngineError::RoutingError { from: id.clone(), target });
                                } else {
                                    warn!(
                                        step_id = %id, target = %target,
                                        "routing named an unknown step; continuing without activating it (stop_on_fail = false)"
                                    );
                                    if let Some(mut record) = context.record_for(&id).await {
                                        record.errors.push(format!("routing to unknown step '{target}'"));
                                        context.record_step(&id, record).await;
                                    }
                                }
                            }
                            Ok(None) => {
                                for edge in &all_edges {
                                    if edge.from == id {
                                        activated.insert(edge.to.clone());
                                    }
                                }
                            }
                            Err(e) => abort = Some(e),
                        }
                    }
                    Err(kind) => {
                        terminal.insert(id.clone(), Terminal::Fail);
                        warn!(step_id = %id, error = %kind, "step failed after exhausting retries");
                        if step.stop_on_fail {
                            abort = Some(EngineError::RetryExhausted { step_id: id.clone(), source: kind });
                        } else {
                            for edge in &all_edges {
                                if edge.from == id {
                                    activated.insert(edge.to.clone());
                                }
                            }
                        }
                    }
                }
            }
        }

        if let Some(err) = abort {
            context.finish(WorkflowStatus::Fail).await;
            return Err(err);
        }

        context.finish(WorkflowStatus::Success).await;
        Ok(())
    }

    /// Drive one layer's steps through as many retry rounds as needed,
    /// one `Runner::run_batch` call per round.
    async fn run_layer(
        &self,
        ids: &[String],
        step_map: &HashMap<String, StepDefinition>,
        context: &Context,
    ) -> HashMap<String, Result<Value, StepErrorKind>> {
        let mut attempt: HashMap<String, u32> = ids.iter().map(|id| (id.clone(), 0)).collect();
        let mut pending: Vec<String> = ids.to_vec();
        let mut results = HashMap::new();

        while !pending.is_empty() {
            let mut requests = Vec::with_capacity(pending.len());
            let mut resolved_inputs: HashMap<String, Value> = HashMap::new();
            let mut job_results: HashMap<String, JobResult> = HashMap::new();

            for id in &pending {
                let step = &step_map[id];
                let inputs = resolve_inputs(step, context).await;
                resolved_inputs.insert(id.clone(), inputs.clone());

                let this_attempt = attempt.get(id).copied().unwrap_or(0) + 1;
                context.mark_step_running(id, this_attempt).await;
                job_results.insert(id.clone(), JobResult::start(id.clone(), step.name.clone(), this_attempt, inputs.clone()));

                let ctx = JobContext {
                    workflow_id: context.workflow_id(),
                    step_id: id.clone(),
                    globals: context.globals().await,
                    results: context.results().await,
                };

                requests.push(RunRequest {
                    step_id: id.clone(),
                    job: step.job.clone(),
                    inputs,
                    context: ctx,
                    timeout: step.timeout,
                });
            }

            let outcomes = self.runner.run_batch(requests, self.config.max_parallelism).await;

            let mut next_pending = Vec::new();
            for id in &pending {
                let this_attempt = attempt.get(id).copied().unwrap_or(0) + 1;
                attempt.insert(id.clone(), this_attempt);

                let step = &step_map[id];
                let outcome = outcomes.get(id).cloned().unwrap_or_else(|| {
                    StepOutcome::failure("runner produced no outcome for this step", Vec::new(), vec!["missing outcome".into()])
                });

                let mut job_result = job_results.remove(id).expect("every pending step started a job result this round");
                if !outcome.success {
                    job_result.errors = if !outcome.errors.is_empty() {
                        outcome.errors.clone()
                    } else {
                        vec![outcome.error.clone().unwrap_or_else(|| "unknown failure".into())]
                    };
                }
                job_result.finish(outcome.result.clone().unwrap_or(Value::Null));

                let mut record = ExecutionRecord::pending();
                record.attempts = this_attempt;
                record.started_at = Some(job_result.start_time);
                record.ended_at = job_result.end_time;
                record.execution_time_seconds = job_result.duration.unwrap_or(0.0);
                record.inputs = resolved_inputs.remove(id).unwrap_or(Value::Null);
                record.logs = outcome.logs.clone();

                if outcome.success {
                    let output = outcome.result.clone().unwrap_or(Value::Null);
                    record.status = StepStatus::Success;
                    record.output = Some(output.clone());
                    context.record_step(id, record).await;
                    results.insert(id.clone(), Ok(output));
                    continue;
                }

                let kind = if outcome.timed_out {
                    StepErrorKind::Timeout
                } else if !outcome.errors.is_empty() {
                    StepErrorKind::JobReportedError(outcome.errors.join("; "))
                } else {
                    StepErrorKind::JobException(outcome.error.clone().unwrap_or_else(|| "unknown failure".into()))
                };

                if this_attempt >= step.retry.max_attempts {
                    record.status = StepStatus::Fail;
                    record.errors = outcome.errors.clone();
                    if record.errors.is_empty() {
                        record.errors.push(kind.message());
                    }
                    context.record_step(id, record).await;
                    results.insert(id.clone(), Err(kind));
                } else {
                    let delay = step.retry.delay(this_attempt);
                    warn!(step_id = %id, attempt = this_attempt, ?delay, "step failed, retrying");
                    tokio::time::sleep(delay).await;
                    next_pending.push(id.clone());
                }
            }

            pending = next_pending;
        }

        results
    }
}

/// Resolve a step's `InputSpec` against the run's current globals and
/// results, globals-first then input-spec entries win (Open Questions
/// ledger #3).
async fn resolve_inputs(step: &StepDefinition, context: &Context) -> Value {
    let mut map = match context.globals().await {
        Value::Object(m) => m,
        _ => serde_json::Map::new(),
    };

    for (field, source) in &step.inputs {
        let value = match source {
            InputRef::Global(key) => map.get(key).cloned().unwrap_or(Value::Null),
            InputRef::StepOutput { step_id, field: sub } => {
                let output = context.result_for(step_id).await.unwrap_or(Value::Null);
                match sub {
                    Some(f) => output.get(f).cloned().unwrap_or(Value::Null),
                    None => output,
                }
            }
            InputRef::Literal(v) => v.clone(),
        };
        map.insert(field.clone(), value);
    }

    Value::Object(map)
}

fn route(step: &StepDefinition, output: &Value) -> Result<Option<String>, EngineError> {
    match &step.routing {
        Routing::Static => Ok(None),
        Routing::Decide(decider) => Ok(decider.evaluate(output)),
        Routing::Callback(cb) => Ok(cb(output)),
    }
}

fn union_edges(steps: &[StepDefinition], edges: &[Edge]) -> Vec<Edge> {
    let mut all = edges.to_vec();
    for step in steps {
        for source in step.inputs.values() {
            if let InputRef::StepOutput { step_id, .. } = source {
                all.push(Edge { from: step_id.clone(), to: step.id.clone() });
            }
        }
    }
    all
}
