//! The Context snapshot wire format — spec §6.
//!
//! This is a typed mirror of the JSON shape in spec §6, rather than a
//! loosely-typed `serde_json::Value`, so the shape is enforced by the
//! compiler the same way the teacher's `db::models::*Row` structs enforce
//! their table shapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{StepStatus, WorkflowStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub start_memory: u64,
    pub peak_memory: u64,
    pub memory_used: u64,
    pub execution_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySnapshot {
    pub max_attempts: u32,
    pub base_delay: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub inputs: Value,
    pub retry: Option<RetrySnapshot>,
    pub timeout: Option<f64>,
    pub stop_on_fail: bool,
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepPerformanceSnapshot {
    pub execution_time: f64,
    pub memory_used: u64,
    pub peak_memory: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedJobSnapshot {
    pub status: StepStatus,
    pub started_at: Option<f64>,
    pub completed_at: Option<f64>,
    pub inputs: Value,
    pub outputs: Option<Value>,
    pub logs: Vec<String>,
    pub errors: Vec<String>,
    pub performance: StepPerformanceSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub workflow_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: WorkflowStatus,
    pub started_at: Option<f64>,
    pub completed_at: Option<f64>,
    pub globals: Value,
    pub performance: PerformanceSnapshot,
    pub steps: Vec<StepSnapshot>,
    pub results: Map<String, Value>,
    pub executed_jobs: HashMap<String, ExecutedJobSnapshot>,
}
