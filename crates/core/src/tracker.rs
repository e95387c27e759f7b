//! Tracker — spec §4.E.
//!
//! An observer sink: failures here must never affect workflow execution.
//! `NoopTracker` is the default; real sinks (e.g. the Redis-backed mirror
//! in `workflow-tracker`) implement the same trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::snapshot::ContextSnapshot;

#[async_trait]
pub trait Tracker: Send + Sync {
    async fn track(&self, workflow_id: Uuid, snapshot: &ContextSnapshot);
}

/// The default tracker: observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

#[async_trait]
impl Tracker for NoopTracker {
    async fn track(&self, _workflow_id: Uuid, _snapshot: &ContextSnapshot) {}
}
