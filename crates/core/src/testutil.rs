//! Test doubles for [`Job`] — the in-tree equivalent of the teacher
//! project's own `nodes::mock::MockNode` fixture, adapted to this crate's
//! `Job` trait so engine tests don't need a real domain job.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::job::{Job, JobContext, JobException, JobOutcome};
use crate::serialize::JobDescriptor;

pub enum MockBehavior {
    Return(Value),
    ReportErrors(Vec<String>),
    Raise(String),
}

/// A job that always does the same thing and records every call it
/// receives.
pub struct MockJob {
    name: String,
    behavior: MockBehavior,
    calls: Arc<Mutex<Vec<Value>>>,
    descriptor: Option<JobDescriptor>,
}

impl MockJob {
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Return(value),
            calls: Arc::new(Mutex::new(Vec::new())),
            descriptor: None,
        }
    }

    pub fn reporting_errors(name: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::ReportErrors(errors),
            calls: Arc::new(Mutex::new(Vec::new())),
            descriptor: None,
        }
    }

    pub fn raising(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Raise(message.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
            descriptor: None,
        }
    }

    /// Make this mock serializable across the out-of-process runner
    /// boundary, registered under `class`.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let id = self.name.clone();
        self.descriptor = Some(JobDescriptor { class: class.into(), id, data: None });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Job for MockJob {
    async fn run(&self, inputs: Value, _ctx: &JobContext) -> Result<JobOutcome, JobException> {
        self.calls.lock().unwrap().push(inputs);
        match &self.behavior {
            MockBehavior::Return(v) => Ok(JobOutcome::success(v.clone())),
            MockBehavior::ReportErrors(errors) => Ok(JobOutcome {
                output: Value::Null,
                logs: Vec::new(),
                errors: errors.clone(),
            }),
            MockBehavior::Raise(message) => Err(JobException(message.clone())),
        }
    }

    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> Option<JobDescriptor> {
        self.descriptor.clone()
    }
}

/// One step of a [`ScriptedJob`]'s scripted behavior, consumed in order —
/// one action per `run` call.
pub enum ScriptedAction {
    SleepThenSucceed(Duration, Value),
    SleepThenReportErrors(Duration, Vec<String>),
    Raise(String),
}

/// A job that plays back a fixed script of actions, one per call — used
/// to deterministically exercise retry/timeout/backoff scenarios (spec
/// §8, scenarios 3 and 6) without depending on real flakiness.
pub struct ScriptedJob {
    name: String,
    script: Mutex<Vec<ScriptedAction>>,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl ScriptedJob {
    pub fn new(name: impl Into<String>, script: Vec<ScriptedAction>) -> Self {
        Self {
            name: name.into(),
            // scripted in call order; pop from the back, so reverse once up front.
            script: Mutex::new(script.into_iter().rev().collect()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Job for ScriptedJob {
    async fn run(&self, inputs: Value, _ctx: &JobContext) -> Result<JobOutcome, JobException> {
        self.calls.lock().unwrap().push(inputs);
        let action = self
            .script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(ScriptedAction::SleepThenReportErrors(Duration::ZERO, vec!["script exhausted".into()]));

        match action {
            ScriptedAction::SleepThenSucceed(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(JobOutcome::success(value))
            }
            ScriptedAction::SleepThenReportErrors(delay, errors) => {
                tokio::time::sleep(delay).await;
                Ok(JobOutcome {
                    output: Value::Null,
                    logs: Vec::new(),
                    errors,
                })
            }
            ScriptedAction::Raise(message) => Err(JobException(message)),
        }
    }

    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }
}
