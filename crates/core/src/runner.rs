//! Runner — spec §4.F.
//!
//! A strategy for executing a batch of steps, either in-process or
//! out-of-process. The scheduler calls `run_batch` once per retry round
//! with exactly the steps still due for an attempt in that round; the
//! runner owns how much of the batch runs concurrently (spec §5: "the
//! Runner may execute up to min(N, maxParallelism) jobs concurrently ...
//! the Runner chooses").

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::job::{Job, JobContext};

/// Outcome of one attempt of one step, as returned across the Runner
/// boundary (and, for the out-of-process runner, across the wire).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub memory_used: u64,
    #[serde(default)]
    pub peak_memory: u64,
    /// Set when the request's `timeout` elapsed before the job returned,
    /// so callers can tag the failure `StepErrorKind::Timeout` without
    /// resorting to matching on `error`'s message text.
    #[serde(default)]
    pub timed_out: bool,
}

impl StepOutcome {
    pub fn success(result: Value, logs: Vec<String>) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            errors: Vec::new(),
            logs,
            memory_used: 0,
            peak_memory: 0,
            timed_out: false,
        }
    }

    /// A job raised an exception (`JOB_EXCEPTION`): a single message, no
    /// structured error list.
    pub fn failure(error: impl Into<String>, logs: Vec<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            errors,
            logs,
            memory_used: 0,
            peak_memory: 0,
            timed_out: false,
        }
    }

    /// A job returned normally but reported errors (`JOB_REPORTED_ERROR`).
    pub fn reported_errors(errors: Vec<String>, logs: Vec<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: None,
            errors,
            logs,
            memory_used: 0,
            peak_memory: 0,
            timed_out: false,
        }
    }

    pub fn timeout() -> Self {
        Self {
            success: false,
            result: None,
            error: Some("step timed out".into()),
            errors: Vec::new(),
            logs: Vec::new(),
            memory_used: 0,
            peak_memory: 0,
            timed_out: true,
        }
    }
}

/// One attempt of one step, ready to hand to a [`Runner`].
pub struct RunRequest {
    pub step_id: String,
    pub job: Arc<dyn Job>,
    pub inputs: Value,
    pub context: JobContext,
    pub timeout: Option<Duration>,
}

#[async_trait]
pub trait Runner: Send + Sync {
    /// Run every request in `requests`, honouring `max_parallelism` as a
    /// concurrency ceiling (`None` = unbounded within the batch). Returns
    /// one outcome per `step_id` — callers may assume every requested
    /// step_id is present in the result.
    async fn run_batch(&self, requests: Vec<RunRequest>, max_parallelism: Option<usize>) -> HashMap<String, StepOutcome>;
}
