//! `OutOfProcessRunner` — spawns one worker subprocess per step (spec
//! §4.F, §6).
//!
//! Finishes what the teacher's own CLI left stubbed
//! (`Command::Worker => todo!("Worker not yet implemented")`): each
//! request is marshaled to a temp file, handed to a worker subcommand as
//! an argument, and the worker's single line of JSON on stdout is parsed
//! back into a [`StepOutcome`]. A non-zero exit code is always a
//! failure, whatever stdout contains.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{error, warn};

use workflow_core::{JobContext, RunRequest, Runner, StepOutcome};

/// Wire payload written to the temp file the worker process reads.
#[derive(Debug, Serialize, Deserialize)]
struct WorkerRequest {
    descriptor: workflow_core::JobDescriptor,
    inputs: Value,
    workflow_id: String,
    step_id: String,
    globals: Value,
    results: Value,
}

#[derive(Debug, Clone)]
pub struct OutOfProcessConfig {
    /// Program and leading args used to invoke the worker, e.g.
    /// `["workflow-cli", "worker"]`. The temp file path is appended.
    pub worker_command: Vec<String>,
    /// Wall-clock ceiling for the whole subprocess, independent of any
    /// per-step `timeout` already encoded in the request.
    pub process_timeout: Duration,
}

impl Default for OutOfProcessConfig {
    fn default() -> Self {
        Self {
            worker_command: vec!["workflow-cli".to_string(), "worker".to_string()],
            process_timeout: Duration::from_secs(300),
        }
    }
}

pub struct OutOfProcessRunner {
    config: OutOfProcessConfig,
}

impl OutOfProcessRunner {
    pub fn new(config: OutOfProcessConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Runner for OutOfProcessRunner {
    async fn run_batch(&self, requests: Vec<RunRequest>, max_parallelism: Option<usize>) -> HashMap<String, StepOutcome> {
        let permits = max_parallelism.unwrap_or(requests.len().max(1)).max(1);
        let semaphore = Arc::new(Semaphore::new(permits));

        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let semaphore = semaphore.clone();
            let config = self.config.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("runner semaphore closed early");
                let step_id = request.step_id.clone();
                (step_id, run_one(&config, request).await)
            }));
        }

        let mut results = HashMap::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((step_id, outcome)) => {
                    results.insert(step_id, outcome);
                }
                Err(join_err) => error!("out-of-process runner task panicked: {join_err}"),
            }
        }
        results
    }
}

async fn run_one(config: &OutOfProcessConfig, request: RunRequest) -> StepOutcome {
    let Some(descriptor) = request.job.descriptor() else {
        return StepOutcome::failure(
            format!("job '{}' has no out-of-process descriptor", request.job.id()),
            Vec::new(),
            Vec::new(),
        );
    };

    let JobContext { workflow_id, step_id, globals, results } = request.context;
    let payload = WorkerRequest {
        descriptor,
        inputs: request.inputs,
        workflow_id: workflow_id.to_string(),
        step_id,
        globals,
        results,
    };

    let body = match serde_json::to_vec_pretty(&payload) {
        Ok(b) => b,
        Err(e) => return StepOutcome::failure(format!("failed to marshal request: {e}"), Vec::new(), Vec::new()),
    };

    let mut file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(e) => return StepOutcome::failure(format!("failed to create temp file: {e}"), Vec::new(), Vec::new()),
    };

    if let Err(e) = std::io::Write::write_all(&mut file, &body) {
        return StepOutcome::failure(format!("failed to write temp file: {e}"), Vec::new(), Vec::new());
    }
    let path = file.path().to_path_buf();

    let Some((program, leading_args)) = config.worker_command.split_first() else {
        return StepOutcome::failure("out-of-process runner has no worker command configured", Vec::new(), Vec::new());
    };

    let mut command = Command::new(program);
    command.args(leading_args).arg(&path).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let child = match command.spawn() {
        Ok(c) => c,
        Err(e) => {
            // `file` drops here regardless, cleaning up the temp file.
            return StepOutcome::failure(format!("failed to spawn worker process: {e}"), Vec::new(), Vec::new());
        }
    };

    let output = tokio::time::timeout(config.process_timeout, child.wait_with_output()).await;
    // `file` is dropped here (deleting the temp file) no matter the outcome below.
    drop(file);

    let output = match output {
        Ok(Ok(o)) => o,
        Ok(Err(e)) => return StepOutcome::failure(format!("worker process I/O error: {e}"), Vec::new(), Vec::new()),
        Err(_) => return StepOutcome::timeout(),
    };

    if !output.status.success() {
        let stderr_tail = tail(&output.stderr, 2048);
        warn!(status = %output.status, "worker process exited non-zero");
        return StepOutcome::failure(
            format!("worker process exited with {}: {}", output.status, stderr_tail),
            Vec::new(),
            Vec::new(),
        );
    }

    match serde_json::from_slice::<StepOutcome>(&output.stdout) {
        Ok(outcome) => outcome,
        Err(e) => StepOutcome::failure(format!("failed to parse worker stdout as JSON: {e}"), Vec::new(), Vec::new()),
    }
}

fn tail(bytes: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= max {
        text.into_owned()
    } else {
        text[text.len() - max..].to_string()
    }
}
