//! Context — the single source of truth for one workflow run (spec §4.D).
//!
//! Wrapped in an `Arc<Mutex<..>>` handle, the same shape as the teacher's
//! `DbPool`: the handle is cheap to clone and passed around by value,
//! every mutation takes the lock internally. Every mutation also fires a
//! snapshot at the `Tracker` (spec §5: tracker calls must never block
//! forward progress, so the call is spawned rather than awaited).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use workflow_core::{
    ContextSnapshot, ExecutedJobSnapshot, ExecutionRecord, PerformanceSnapshot, RetrySnapshot,
    StepPerformanceSnapshot, StepSnapshot, StepStatus, Tracker, WorkflowStatus,
};

use crate::models::{Edge, StepDefinition};

struct ContextInner {
    workflow_id: Uuid,
    name: String,
    description: Option<String>,
    status: WorkflowStatus,
    started_at: Option<chrono::DateTime<Utc>>,
    completed_at: Option<chrono::DateTime<Utc>>,
    globals: Value,
    step_meta: Vec<StepSnapshot>,
    results: Map<String, Value>,
    records: HashMap<String, ExecutionRecord>,
}

/// Cloneable handle onto one workflow run's shared mutable state.
#[derive(Clone)]
pub struct Context {
    workflow_id: Uuid,
    inner: Arc<Mutex<ContextInner>>,
    tracker: Arc<dyn Tracker>,
    run_start: Instant,
}

impl Context {
    pub fn new(
        workflow_id: Uuid,
        name: impl Into<String>,
        description: Option<String>,
        globals: Value,
        steps: &[StepDefinition],
        edges: &[Edge],
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        let step_meta = steps
            .iter()
            .map(|step| {
                let connections: Vec<String> = edges
                    .iter()
                    .filter(|e| e.from == step.id)
                    .map(|e| e.to.clone())
                    .collect();
                StepSnapshot {
                    id: step.id.clone(),
                    name: step.name.clone(),
                    description: step.description.clone(),
                    inputs: serde_json::to_value(&step.inputs).unwrap_or(Value::Null),
                    retry: Some(RetrySnapshot {
                        max_attempts: step.retry.max_attempts,
                        base_delay: step.retry.base_delay_seconds,
                        multiplier: step.retry.multiplier,
                    }),
                    timeout: step.timeout.map(|d| d.as_secs_f64()),
                    stop_on_fail: step.stop_on_fail,
                    connections,
                }
            })
            .collect();

        let inner = ContextInner {
            workflow_id,
            name: name.into(),
            description,
            status: WorkflowStatus::Pending,
            started_at: None,
            completed_at: None,
            globals,
            step_meta,
            results: Map::new(),
            records: HashMap::new(),
        };

        Self {
            workflow_id,
            inner: Arc::new(Mutex::new(inner)),
            tracker,
            run_start: Instant::now(),
        }
    }

    pub fn workflow_id(&self) -> Uuid {
        self.workflow_id
    }

    async fn notify(&self) {
        let snapshot = self.snapshot().await;
        let tracker = self.tracker.clone();
        let workflow_id = self.workflow_id;
        tokio::spawn(async move {
            tracker.track(workflow_id, &snapshot).await;
        });
    }

    pub async fn start(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.status = WorkflowStatus::Running;
            inner.started_at = Some(Utc::now());
        }
        self.notify().await;
    }

    pub async fn finish(&self, status: WorkflowStatus) {
        {
            let mut inner = self.inner.lock().await;
            inner.status = status;
            inner.completed_at = Some(Utc::now());
        }
        self.notify().await;
    }

    pub async fn globals(&self) -> Value {
        self.inner.lock().await.globals.clone()
    }

    pub async fn results(&self) -> Value {
        Value::Object(self.inner.lock().await.results.clone())
    }

    pub async fn result_for(&self, step_id: &str) -> Option<Value> {
        self.inner.lock().await.results.get(step_id).cloned()
    }

    /// Mark a step as having started its attempt, before the runner has
    /// produced anything, and push a `Running` snapshot at the tracker.
    /// Without this, a subscriber never sees a step between "pending"
    /// and its terminal status.
    pub async fn mark_step_running(&self, step_id: &str, attempt: u32) {
        {
            let mut inner = self.inner.lock().await;
            inner
                .records
                .insert(step_id.to_string(), ExecutionRecord::running(attempt, Utc::now()));
        }
        self.notify().await;
    }

    /// Record a step's final outcome for this run and push a fresh
    /// snapshot at the tracker.
    pub async fn record_step(&self, step_id: &str, record: ExecutionRecord) {
        {
            let mut inner = self.inner.lock().await;
            if let Some(output) = &record.output {
                inner.results.insert(step_id.to_string(), output.clone());
            }
            inner.records.insert(step_id.to_string(), record);
        }
        self.notify().await;
    }

    pub async fn record_for(&self, step_id: &str) -> Option<ExecutionRecord> {
        self.inner.lock().await.records.get(step_id).cloned()
    }

    pub async fn snapshot(&self) -> ContextSnapshot {
        let inner = self.inner.lock().await;
        let mut executed_jobs = HashMap::new();
        for meta in &inner.step_meta {
            if let Some(record) = inner.records.get(&meta.id) {
                executed_jobs.insert(
                    meta.id.clone(),
                    ExecutedJobSnapshot {
                        status: record.status,
                        started_at: record.started_at.map(|t| t.timestamp() as f64),
                        completed_at: record.ended_at.map(|t| t.timestamp() as f64),
                        inputs: record.inputs.clone(),
                        outputs: record.output.clone(),
                        logs: record.logs.clone(),
                        errors: record.errors.clone(),
                        performance: StepPerformanceSnapshot {
                            execution_time: record.execution_time_seconds,
                            memory_used: record.memory_used,
                            peak_memory: record.peak_memory,
                        },
                    },
                );
            }
        }

        ContextSnapshot {
            workflow_id: inner.workflow_id.to_string(),
            name: inner.name.clone(),
            description: inner.description.clone(),
            status: inner.status,
            started_at: inner.started_at.map(|t| t.timestamp() as f64),
            completed_at: inner.completed_at.map(|t| t.timestamp() as f64),
            globals: inner.globals.clone(),
            performance: PerformanceSnapshot {
                start_memory: 0,
                peak_memory: 0,
                memory_used: 0,
                execution_time: self.run_start.elapsed().as_secs_f64(),
            },
            steps: inner.step_meta.clone(),
            results: inner.results.clone(),
            executed_jobs,
        }
    }
}
