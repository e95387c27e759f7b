//! `InlineRunner` — direct in-process job dispatch (spec §4.F).
//!
//! Generalizes the teacher's node-dispatch loop in
//! `executor::WorkflowExecutor::run` (one `node.execute(...).await` per
//! step) to concurrent siblings within a layer, bounded by a
//! `tokio::sync::Semaphore` + `acquire_owned` + `tokio::spawn` fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::error;

use workflow_core::{RunRequest, Runner, StepOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct InlineRunner;

#[async_trait]
impl Runner for InlineRunner {
    async fn run_batch(&self, requests: Vec<RunRequest>, max_parallelism: Option<usize>) -> HashMap<String, StepOutcome> {
        let permits = max_parallelism.unwrap_or(requests.len().max(1));
        let semaphore = Arc::new(Semaphore::new(permits.max(1)));

        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("runner semaphore closed early");
                let step_id = request.step_id.clone();
                (step_id, run_one(request).await)
            }));
        }

        let mut results = HashMap::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((step_id, outcome)) => {
                    results.insert(step_id, outcome);
                }
                Err(join_err) => error!("inline runner task panicked: {join_err}"),
            }
        }
        results
    }
}

async fn run_one(request: RunRequest) -> StepOutcome {
    let RunRequest { job, inputs, context, timeout, .. } = request;
    let fut = job.run(inputs, &context);

    let result = match timeout {
        Some(duration) => match tokio::time::timeout(duration, fut).await {
            Ok(result) => result,
            Err(_) => return StepOutcome::timeout(),
        },
        None => fut.await,
    };

    match result {
        Ok(outcome) if outcome.is_failure() => StepOutcome::reported_errors(outcome.errors, outcome.logs),
        Ok(outcome) => StepOutcome::success(outcome.output, outcome.logs),
        Err(exception) => StepOutcome::failure(exception.0, Vec::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use workflow_core::testutil::{MockJob, ScriptedAction, ScriptedJob};
    use workflow_core::{Job, JobContext};
    use uuid::Uuid;

    fn ctx(step_id: &str) -> JobContext {
        JobContext {
            workflow_id: Uuid::new_v4(),
            step_id: step_id.into(),
            globals: json!({}),
            results: json!({}),
        }
    }

    #[tokio::test]
    async fn runs_every_request_and_reports_success() {
        let runner = InlineRunner;
        let a: Arc<dyn Job> = Arc::new(MockJob::returning("a", json!({"x": 1})));
        let b: Arc<dyn Job> = Arc::new(MockJob::returning("b", json!({"x": 2})));

        let requests = vec![
            RunRequest { step_id: "a".into(), job: a, inputs: json!({}), context: ctx("a"), timeout: None },
            RunRequest { step_id: "b".into(), job: b, inputs: json!({}), context: ctx("b"), timeout: None },
        ];

        let results = runner.run_batch(requests, None).await;
        assert!(results["a"].success);
        assert!(results["b"].success);
        assert_eq!(results["a"].result, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn job_reported_errors_become_a_failed_outcome_without_error_message() {
        let runner = InlineRunner;
        let job: Arc<dyn Job> = Arc::new(MockJob::reporting_errors("bad", vec!["oops".into()]));
        let requests = vec![RunRequest { step_id: "bad".into(), job, inputs: json!({}), context: ctx("bad"), timeout: None }];

        let results = runner.run_batch(requests, None).await;
        let outcome = &results["bad"];
        assert!(!outcome.success);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.errors, vec!["oops".to_string()]);
    }

    #[tokio::test]
    async fn job_exception_becomes_a_failed_outcome_with_error_message() {
        let runner = InlineRunner;
        let job: Arc<dyn Job> = Arc::new(MockJob::raising("boom", "kaboom"));
        let requests = vec![RunRequest { step_id: "boom".into(), job, inputs: json!({}), context: ctx("boom"), timeout: None }];

        let results = runner.run_batch(requests, None).await;
        let outcome = &results["boom"];
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("kaboom"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_job_past_its_timeout_is_reported_as_timed_out() {
        let runner = InlineRunner;
        let job: Arc<dyn Job> = Arc::new(ScriptedJob::new(
            "slow",
            vec![ScriptedAction::SleepThenSucceed(Duration::from_secs(10), json!({}))],
        ));
        let requests = vec![RunRequest {
            step_id: "slow".into(),
            job,
            inputs: json!({}),
            context: ctx("slow"),
            timeout: Some(Duration::from_secs(1)),
        }];

        let handle = tokio::spawn(async move { runner.run_batch(requests, None).await });
        tokio::time::advance(Duration::from_secs(2)).await;
        let results = handle.await.unwrap();

        assert!(results["slow"].timed_out);
        assert!(!results["slow"].success);
    }
}
