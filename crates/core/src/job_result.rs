//! JobResult — spec §4.C.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobResultStatus {
    Pending,
    Success,
    Failed,
}

/// Record of one step execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub step_id: String,
    pub job_name: String,
    pub attempt_number: u32,
    pub status: JobResultStatus,
    pub output: Value,
    pub errors: Vec<String>,
    pub logs: Vec<String>,
    pub input: Value,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
}

impl JobResult {
    pub fn start(step_id: impl Into<String>, job_name: impl Into<String>, attempt_number: u32, input: Value) -> Self {
        Self {
            step_id: step_id.into(),
            job_name: job_name.into(),
            attempt_number,
            status: JobResultStatus::Pending,
            output: Value::Null,
            errors: Vec::new(),
            logs: Vec::new(),
            input,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
        }
    }

    /// Close out this attempt: stamps `end_time`/`duration`, derives
    /// `status` from whether `errors` is empty, and wraps a non-mapping
    /// output as `{"result": <value>}`.
    pub fn finish(&mut self, output: Value) {
        let end = Utc::now();
        self.end_time = Some(end);
        self.duration = Some((end - self.start_time).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0);
        self.status = if self.errors.is_empty() {
            JobResultStatus::Success
        } else {
            JobResultStatus::Failed
        };
        self.output = if output.is_object() {
            output
        } else {
            json!({ "result": output })
        };
    }
}
