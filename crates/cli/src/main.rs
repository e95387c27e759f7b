//! `workflow-cli` entry point.
//!
//! Available sub-commands:
//! - `validate` — check a workflow JSON file's graph structure (cycles,
//!   dangling edges, duplicate ids) without running any job.
//! - `run`      — execute a workflow JSON file in-process.
//! - `worker`   — out-of-process worker entry point `OutOfProcessRunner`
//!   spawns; reads a marshaled request file and prints a `StepOutcome`.

mod echo_job;
mod workflow_file;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use workflow_core::testutil::MockJob;
use workflow_core::Job;
use workflow_engine::{StepDefinition, Workflow};
use workflow_runner::InlineRunner;
use workflow_tracker::RedisTracker;

use workflow_file::WorkflowFile;

#[derive(Parser)]
#[command(name = "workflow-cli", about = "In-process workflow execution engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow JSON file's graph structure.
    Validate { path: PathBuf },
    /// Run a workflow JSON file in-process.
    Run {
        path: PathBuf,
        /// Mirror live progress to Redis (`workflow:realtime:*` /
        /// `workflow:updates:*`) instead of discarding it.
        #[arg(long, env = "REDIS_URL")]
        redis_url: Option<String>,
        #[arg(long)]
        max_parallelism: Option<usize>,
    },
    /// Run exactly one marshaled job request, printing its outcome as
    /// JSON on stdout. Invoked by `OutOfProcessRunner`, not by hand.
    Worker { request_path: PathBuf },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate { path } => validate(path).await,
        Command::Run { path, redis_url, max_parallelism } => run(path, redis_url, max_parallelism).await,
        Command::Worker { request_path } => worker(request_path).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// Structural-only check: builds placeholder [`MockJob`]s for every step
/// so the graph can be validated (cycles, dangling edges, duplicate ids)
/// without resolving any real job class.
async fn validate(path: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&path)?;
    let file = WorkflowFile::parse(&content)?;

    let steps: Vec<StepDefinition> = file
        .step_ids()
        .into_iter()
        .map(|id| {
            let job: Arc<dyn Job> = Arc::new(MockJob::returning(id.clone(), serde_json::Value::Null));
            StepDefinition::new(id, job)
        })
        .collect();

    let workflow = steps.into_iter().fold(Workflow::new(file.name.clone(), Arc::new(InlineRunner)), Workflow::add_step);
    let workflow = file.edges().into_iter().fold(workflow, |wf, edge| wf.connect(edge.from, edge.to));

    match workflow.validate() {
        Ok(()) => {
            println!("workflow '{}' is valid", file.name);
            Ok(())
        }
        Err(e) => {
            eprintln!("workflow '{}' is invalid: {e}", file.name);
            std::process::exit(1);
        }
    }
}

async fn run(path: PathBuf, redis_url: Option<String>, max_parallelism: Option<usize>) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&path)?;
    let file = WorkflowFile::parse(&content)?;
    let registry = echo_job::registry();
    let steps = file.build_steps(&registry)?;

    let mut workflow = steps.into_iter().fold(Workflow::new(file.name.clone(), Arc::new(InlineRunner)), Workflow::add_step);
    workflow = file.edges().into_iter().fold(workflow, |wf, edge| wf.connect(edge.from, edge.to));
    workflow = workflow.with_globals(file.globals.clone());
    if let Some(n) = max_parallelism {
        workflow = workflow.with_max_parallelism(n);
    }
    if let Some(url) = redis_url {
        let tracker = RedisTracker::connect(&url).await?;
        workflow = workflow.with_tracker(Arc::new(tracker));
        info!(%url, "mirroring workflow progress to redis");
    }

    let outcome = workflow.run().await?;
    println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
    if outcome.result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

async fn worker(request_path: PathBuf) -> anyhow::Result<()> {
    let registry = echo_job::registry();
    let outcome = workflow_runner::run_worker_once(&request_path, &registry).await;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}
