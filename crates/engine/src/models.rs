//! Step/edge/input definitions that make up a workflow graph (spec §3,
//! `StepDefinition` and `Edge`).

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use workflow_core::{Decider, Job, RetryPolicy};

/// Where a step's resolved input field comes from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InputRef {
    /// Copy a field out of the workflow's globals map.
    Global(String),
    /// Copy a field (or the whole output, if `field` is `None`) out of a
    /// prior step's result.
    StepOutput { step_id: String, field: Option<String> },
    /// A fixed value baked into the workflow definition.
    Literal(Value),
}

/// Declarative mapping from a step's input field name to where its value
/// comes from. Resolved fresh before every attempt; per the Open
/// Questions ledger, an input wins over a same-named global. Backed by
/// an order-preserving map since spec §3 requires `inputSpec` to report
/// fields in declaration order.
pub type InputSpec = IndexMap<String, InputRef>;

/// Static edge in the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// Dynamic-routing callback: given a step's resolved output, choose the
/// next step id, or `None` to fall back on the static edges.
pub type RoutingCallback = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// How a step picks its successor(s) once it completes, on top of the
/// graph's static edges (spec §4.B).
#[derive(Clone)]
pub enum Routing {
    /// No dynamic routing — the static edges decide fan-out.
    Static,
    /// Evaluate a [`Decider`] against the step's output.
    Decide(Decider),
    /// Call a Rust closure with the step's output.
    Callback(RoutingCallback),
}

impl std::fmt::Debug for Routing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Routing::Static => write!(f, "Routing::Static"),
            Routing::Decide(d) => f.debug_tuple("Routing::Decide").field(d).finish(),
            Routing::Callback(_) => write!(f, "Routing::Callback(<fn>)"),
        }
    }
}

impl Default for Routing {
    fn default() -> Self {
        Routing::Static
    }
}

/// A single node in the workflow graph: a job plus the scheduling
/// metadata that governs how and when it runs (spec §3, `StepDefinition`).
#[derive(Clone)]
pub struct StepDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub job: Arc<dyn Job>,
    pub inputs: InputSpec,
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
    /// When `true`, a fully-retried failure of this step aborts the
    /// whole run instead of just skipping downstream steps.
    pub stop_on_fail: bool,
    pub routing: Routing,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>, job: Arc<dyn Job>) -> Self {
        let id = id.into();
        let name = job.name().to_string();
        let description = job.description().to_string();
        Self {
            id,
            name,
            description,
            job,
            inputs: InputSpec::new(),
            retry: RetryPolicy::default(),
            timeout: None,
            stop_on_fail: true,
            routing: Routing::Static,
        }
    }

    pub fn with_input(mut self, field: impl Into<String>, source: InputRef) -> Self {
        self.inputs.insert(field.into(), source);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_stop_on_fail(mut self, stop_on_fail: bool) -> Self {
        self.stop_on_fail = stop_on_fail;
        self
    }

    pub fn with_routing(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
    }
}
