//! Integration tests for the graph engine — one per acceptance scenario
//! this spec names: linear propagation, parallel fan-out, retry/backoff
//! timing, `stop_on_fail` abort, decider routing, and timeout-then-retry
//! recovery.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use workflow_core::testutil::{MockJob, ScriptedAction, ScriptedJob};
use workflow_core::{Decider, Job, Operator, RetryPolicy};
use workflow_runner::InlineRunner;

use crate::models::{InputRef, Routing, StepDefinition};
use crate::workflow::Workflow;

fn runner() -> Arc<InlineRunner> {
    Arc::new(InlineRunner)
}

#[tokio::test]
async fn linear_pipeline_propagates_output_between_steps() {
    let fetch: Arc<dyn Job> = Arc::new(MockJob::returning("fetch", json!({"id": 7})));
    let process: Arc<dyn Job> = Arc::new(MockJob::returning("process", json!({"processed": true})));

    let steps = vec![
        StepDefinition::new("fetch", fetch),
        StepDefinition::new("process", process)
            .with_input("fetched", InputRef::StepOutput { step_id: "fetch".into(), field: None }),
    ];

    let outcome = steps
        .into_iter()
        .fold(Workflow::new("linear", runner()), |wf, step| wf.add_step(step))
        .connect("fetch", "process")
        .run()
        .await
        .expect("workflow construction should succeed");

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.snapshot.results["process"], json!({"processed": true}));
    assert_eq!(outcome.snapshot.executed_jobs["fetch"].outputs, Some(json!({"id": 7})));
}

#[tokio::test]
async fn diamond_graph_runs_middle_layer_concurrently() {
    let a: Arc<dyn Job> = Arc::new(MockJob::returning("a", json!({"go": true})));
    let b: Arc<dyn Job> = Arc::new(MockJob::returning("b", json!({"leg": "b"})));
    let c: Arc<dyn Job> = Arc::new(MockJob::returning("c", json!({"leg": "c"})));
    let d: Arc<dyn Job> = Arc::new(MockJob::returning("d", json!({"done": true})));

    let workflow = Workflow::new("diamond", runner())
        .add_step(StepDefinition::new("a", a))
        .add_step(StepDefinition::new("b", b))
        .add_step(StepDefinition::new("c", c))
        .add_step(StepDefinition::new("d", d))
        .connect("a", "b")
        .connect("a", "c")
        .connect("b", "d")
        .connect("c", "d");

    let outcome = workflow.run().await.expect("should build");
    assert!(outcome.result.is_ok());
    for id in ["a", "b", "c", "d"] {
        assert!(outcome.snapshot.executed_jobs.contains_key(id), "missing {id}");
    }
}

#[tokio::test(start_paused = true)]
async fn retryable_failure_is_retried_with_exponential_backoff() {
    let job: Arc<dyn Job> = Arc::new(ScriptedJob::new(
        "flaky",
        vec![
            ScriptedAction::SleepThenReportErrors(Duration::ZERO, vec!["transient".into()]),
            ScriptedAction::SleepThenReportErrors(Duration::ZERO, vec!["transient".into()]),
            ScriptedAction::SleepThenSucceed(Duration::ZERO, json!({"ok": true})),
        ],
    ));

    let step = StepDefinition::new("flaky", job).with_retry(RetryPolicy::new(3, 1.0, 2.0, 60.0));

    let handle = tokio::spawn(async move { Workflow::new("retry", runner()).add_step(step).run().await });

    // first failure -> sleep(1s), second failure -> sleep(2s), then success.
    tokio::time::advance(Duration::from_secs(1)).await;
    tokio::time::advance(Duration::from_secs(2)).await;

    let outcome = handle.await.unwrap().expect("should build");
    assert!(outcome.result.is_ok());
    assert_eq!(outcome.snapshot.results["flaky"], json!({"ok": true}));
}

#[tokio::test]
async fn stop_on_fail_aborts_the_run_before_downstream_steps() {
    let ok: Arc<dyn Job> = Arc::new(MockJob::returning("ok", json!({"ok": true})));
    let boom: Arc<dyn Job> = Arc::new(MockJob::raising("boom", "fatal failure"));
    let never: Arc<dyn Job> = Arc::new(MockJob::returning("never", json!({"should": "not run"})));

    let outcome = Workflow::new("abort", runner())
        .add_step(StepDefinition::new("ok", ok))
        .add_step(StepDefinition::new("boom", boom).with_stop_on_fail(true))
        .add_step(StepDefinition::new("never", never))
        .connect("ok", "boom")
        .connect("boom", "never")
        .run()
        .await
        .expect("should build");

    assert!(outcome.result.is_err());
    assert!(!outcome.snapshot.executed_jobs.contains_key("never"));
}

#[tokio::test]
async fn stop_on_fail_false_lets_downstream_run_with_null_for_missing_output() {
    let boom: Arc<dyn Job> = Arc::new(MockJob::raising("boom", "fatal failure"));
    let consumer: Arc<dyn Job> = Arc::new(MockJob::returning("consumer", json!({"consumed": true})));

    let outcome = Workflow::new("non-fatal", runner())
        .add_step(StepDefinition::new("boom", boom).with_stop_on_fail(false).with_retry(RetryPolicy::new(1, 0.0, 1.0, 60.0)))
        .add_step(
            StepDefinition::new("consumer", consumer)
                .with_input("upstream", InputRef::StepOutput { step_id: "boom".into(), field: None }),
        )
        .connect("boom", "consumer")
        .run()
        .await
        .expect("should build");

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.snapshot.executed_jobs["boom"].status, workflow_core::StepStatus::Fail);
    assert_eq!(outcome.snapshot.executed_jobs["consumer"].status, workflow_core::StepStatus::Success);
    assert_eq!(outcome.snapshot.executed_jobs["consumer"].inputs, json!({"upstream": null}));
}

#[tokio::test]
async fn unknown_route_target_with_stop_on_fail_false_does_not_abort() {
    let classify: Arc<dyn Job> = Arc::new(MockJob::returning("classify", json!({"score": 0.9})));
    let high: Arc<dyn Job> = Arc::new(MockJob::returning("high", json!({"tier": "high"})));

    let decider = Decider::new().when("score", Operator::Ge, json!(0.5), "ghost").otherwise("high");

    let outcome = Workflow::new("bad-route", runner())
        .add_step(StepDefinition::new("classify", classify).with_routing(Routing::Decide(decider)).with_stop_on_fail(false))
        .add_step(StepDefinition::new("high", high))
        .connect("classify", "high")
        .run()
        .await
        .expect("should build");

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.snapshot.executed_jobs["classify"].status, workflow_core::StepStatus::Success);
    assert!(!outcome.snapshot.executed_jobs["classify"].errors.is_empty());
    assert_eq!(outcome.snapshot.executed_jobs["high"].status, workflow_core::StepStatus::Skipped);
}

#[tokio::test]
async fn decider_routes_to_exactly_one_branch() {
    let classify: Arc<dyn Job> = Arc::new(MockJob::returning("classify", json!({"score": 0.9})));
    let high: Arc<dyn Job> = Arc::new(MockJob::returning("high", json!({"tier": "high"})));
    let low: Arc<dyn Job> = Arc::new(MockJob::returning("low", json!({"tier": "low"})));

    let decider = Decider::new().when("score", Operator::Ge, json!(0.5), "high").otherwise("low");

    let outcome = Workflow::new("routed", runner())
        .add_step(StepDefinition::new("classify", classify).with_routing(Routing::Decide(decider)))
        .add_step(StepDefinition::new("high", high))
        .add_step(StepDefinition::new("low", low))
        .connect("classify", "high")
        .connect("classify", "low")
        .run()
        .await
        .expect("should build");

    assert!(outcome.result.is_ok());
    assert!(outcome.snapshot.executed_jobs.contains_key("high"));
    assert!(!outcome.snapshot.executed_jobs.contains_key("low") || outcome.snapshot.executed_jobs["low"].status == workflow_core::StepStatus::Skipped);
}

#[tokio::test(start_paused = true)]
async fn timeout_then_retry_recovers() {
    let job: Arc<dyn Job> = Arc::new(ScriptedJob::new(
        "slow_then_fast",
        vec![
            ScriptedAction::SleepThenSucceed(Duration::from_secs(10), json!({"late": true})),
            ScriptedAction::SleepThenSucceed(Duration::ZERO, json!({"on_time": true})),
        ],
    ));

    let step = StepDefinition::new("slow_then_fast", job)
        .with_retry(RetryPolicy::new(2, 0.0, 1.0, 60.0))
        .with_timeout(Duration::from_secs(1));

    let handle = tokio::spawn(async move { Workflow::new("timeout-recovery", runner()).add_step(step).run().await });

    tokio::time::advance(Duration::from_secs(2)).await;

    let outcome = handle.await.unwrap().expect("should build");
    assert!(outcome.result.is_ok());
    assert_eq!(outcome.snapshot.results["slow_then_fast"], json!({"on_time": true}));
}

#[tokio::test]
async fn execution_time_reflects_real_step_duration() {
    let job: Arc<dyn Job> =
        Arc::new(ScriptedJob::new("slow", vec![ScriptedAction::SleepThenSucceed(Duration::from_millis(50), json!({"done": true}))]));
    let step = StepDefinition::new("slow", job);

    let outcome = Workflow::new("timed", runner()).add_step(step).run().await.expect("should build");

    assert!(outcome.result.is_ok());
    let performance = &outcome.snapshot.executed_jobs["slow"].performance;
    assert!(performance.execution_time > 0.0, "expected non-zero execution time, got {}", performance.execution_time);
}

#[tokio::test]
async fn step_snapshot_reports_its_declared_input_spec() {
    let fetch: Arc<dyn Job> = Arc::new(MockJob::returning("fetch", json!({"id": 7})));
    let process: Arc<dyn Job> = Arc::new(MockJob::returning("process", json!({"processed": true})));

    let outcome = Workflow::new("spec-echo", runner())
        .add_step(StepDefinition::new("fetch", fetch))
        .add_step(
            StepDefinition::new("process", process)
                .with_input("fetched", InputRef::StepOutput { step_id: "fetch".into(), field: None }),
        )
        .connect("fetch", "process")
        .run()
        .await
        .expect("should build");

    let process_meta = outcome.snapshot.steps.iter().find(|s| s.id == "process").expect("process step present");
    assert_ne!(process_meta.inputs, json!(null));
    assert_eq!(process_meta.inputs["fetched"]["kind"], json!("step_output"));
    assert_eq!(process_meta.inputs["fetched"]["value"]["step_id"], json!("fetch"));
}

#[tokio::test]
async fn empty_workflow_succeeds_with_nothing_executed() {
    let outcome = Workflow::new("empty", runner()).run().await.expect("should build");
    assert!(outcome.result.is_ok());
    assert!(outcome.snapshot.executed_jobs.is_empty());
}

#[tokio::test]
async fn max_attempts_one_means_no_retry() {
    let job: Arc<dyn Job> = Arc::new(MockJob::reporting_errors("once", vec!["nope".into()]));
    let step = StepDefinition::new("once", job).with_retry(RetryPolicy::new(1, 0.0, 1.0, 60.0)).with_stop_on_fail(false);

    let outcome = Workflow::new("single-attempt", runner()).add_step(step).run().await.expect("should build");
    assert!(outcome.result.is_ok());
    assert_eq!(outcome.snapshot.executed_jobs["once"].status, workflow_core::StepStatus::Fail);
}
