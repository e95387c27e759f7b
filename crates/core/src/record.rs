//! Per-step and per-workflow status, and the `ExecutionRecord` that
//! `Context` keeps for every step (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Fail,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Success,
    Fail,
}

/// Per-step, per-run execution bookkeeping (spec §3, "ExecutionRecord").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub status: StepStatus,
    pub attempts: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub execution_time_seconds: f64,
    pub memory_used: u64,
    pub peak_memory: u64,
    pub inputs: Value,
    pub output: Option<Value>,
    pub errors: Vec<String>,
    pub logs: Vec<String>,
    pub skip_reason: Option<String>,
}

impl ExecutionRecord {
    pub fn pending() -> Self {
        Self {
            status: StepStatus::Pending,
            attempts: 0,
            started_at: None,
            ended_at: None,
            execution_time_seconds: 0.0,
            memory_used: 0,
            peak_memory: 0,
            inputs: Value::Null,
            output: None,
            errors: Vec::new(),
            logs: Vec::new(),
            skip_reason: None,
        }
    }

    /// A step's record the instant its attempt starts, before the runner
    /// has produced anything. `attempt` is 1-based.
    pub fn running(attempt: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            status: StepStatus::Running,
            attempts: attempt,
            started_at: Some(started_at),
            ..Self::pending()
        }
    }
}

impl Default for ExecutionRecord {
    fn default() -> Self {
        Self::pending()
    }
}
