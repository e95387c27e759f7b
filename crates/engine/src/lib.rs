//! `workflow-engine` — the graph engine: DAG layering, the `Context`
//! single source of truth, the `Scheduler`, and the `Workflow` façade
//! (spec §4.A–§4.H).

pub mod context;
pub mod dag;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod workflow;

pub use context::Context;
pub use dag::compute_layers;
pub use error::EngineError;
pub use models::{Edge, InputRef, InputSpec, Routing, RoutingCallback, StepDefinition};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use workflow::{Workflow, WorkflowRunOutcome};

#[cfg(test)]
mod engine_tests;
