//! The out-of-process worker side of [`crate::process::OutOfProcessRunner`]
//! (spec §4.F, §6): read the temp file, reconstruct the job via the
//! process-wide [`JobRegistry`], run it once, and return the outcome for
//! the caller to print as JSON on stdout.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use workflow_core::{Job, JobContext, JobDescriptor, JobRegistry, StepOutcome};

#[derive(Debug, Deserialize)]
struct WorkerRequest {
    descriptor: JobDescriptor,
    inputs: Value,
    workflow_id: String,
    step_id: String,
    globals: Value,
    results: Value,
}

/// Run exactly one job as described by the request file at `path`,
/// returning the outcome the caller should serialize to stdout.
///
/// Never panics on a malformed request or an unknown job class — those
/// become a regular failed [`StepOutcome`] so the parent process's
/// "non-zero exit or bad JSON is a failure" contract is all it needs to
/// rely on.
pub async fn run_worker_once(path: &Path, registry: &JobRegistry) -> StepOutcome {
    let body = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => return StepOutcome::failure(format!("worker could not read request file: {e}"), Vec::new(), Vec::new()),
    };

    let request: WorkerRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return StepOutcome::failure(format!("worker could not parse request file: {e}"), Vec::new(), Vec::new()),
    };

    let job = match registry.instantiate(&request.descriptor) {
        Ok(job) => job,
        Err(e) => return StepOutcome::failure(format!("worker could not instantiate job: {e}"), Vec::new(), Vec::new()),
    };

    let workflow_id = match request.workflow_id.parse() {
        Ok(id) => id,
        Err(e) => return StepOutcome::failure(format!("worker received an invalid workflow id: {e}"), Vec::new(), Vec::new()),
    };

    let ctx = JobContext {
        workflow_id,
        step_id: request.step_id,
        globals: request.globals,
        results: request.results,
    };

    match job.run(request.inputs, &ctx).await {
        Ok(outcome) if outcome.is_failure() => StepOutcome::reported_errors(outcome.errors, outcome.logs),
        Ok(outcome) => StepOutcome::success(outcome.output, outcome.logs),
        Err(exception) => StepOutcome::failure(exception.0, Vec::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Arc;
    use workflow_core::testutil::MockJob;

    fn registry_with_echo() -> JobRegistry {
        let mut registry = JobRegistry::new();
        registry.register(
            "echo",
            Arc::new(|descriptor: &JobDescriptor| Ok(Arc::new(MockJob::returning(descriptor.id.clone(), json!({"echoed": true}))) as Arc<dyn Job>)),
        );
        registry
    }

    #[tokio::test]
    async fn runs_a_registered_job_and_returns_success() {
        let registry = registry_with_echo();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let payload = json!({
            "descriptor": {"class": "echo", "id": "step-1", "data": null},
            "inputs": {},
            "workflow_id": uuid::Uuid::new_v4().to_string(),
            "step_id": "step-1",
            "globals": {},
            "results": {},
        });
        file.write_all(payload.to_string().as_bytes()).unwrap();

        let outcome = run_worker_once(file.path(), &registry).await;
        assert!(outcome.success);
        assert_eq!(outcome.result, Some(json!({"echoed": true})));
    }

    #[tokio::test]
    async fn unknown_class_is_a_failed_outcome_not_a_panic() {
        let registry = registry_with_echo();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let payload = json!({
            "descriptor": {"class": "ghost", "id": "step-1", "data": null},
            "inputs": {},
            "workflow_id": uuid::Uuid::new_v4().to_string(),
            "step_id": "step-1",
            "globals": {},
            "results": {},
        });
        file.write_all(payload.to_string().as_bytes()).unwrap();

        let outcome = run_worker_once(file.path(), &registry).await;
        assert!(!outcome.success);
    }
}
