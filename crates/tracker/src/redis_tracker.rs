//! `RedisTracker` — mirrors every [`ContextSnapshot`] to Redis as both a
//! key/value read path and a pub/sub push path (spec §4.E, §6).
//!
//! Storage layout is exactly spec §6's: `workflow:realtime:{workflowId}`
//! (SET with a TTL) and `workflow:updates:{workflowId}` (PUBLISH). Errors
//! are logged and swallowed — a failing tracker must never affect
//! workflow execution (spec §5), matching the teacher's own
//! log-and-move-on handling of infra errors in `api::handlers::*`.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::warn;
use uuid::Uuid;

use workflow_core::{ContextSnapshot, Tracker};

const DEFAULT_TTL_SECONDS: u64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum TrackerConnectError {
    #[error("failed to connect to redis: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Clone)]
pub struct RedisTracker {
    manager: redis::aio::ConnectionManager,
    ttl_seconds: u64,
}

impl RedisTracker {
    pub async fn connect(redis_url: &str) -> Result<Self, TrackerConnectError> {
        let client = redis::Client::open(redis_url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager, ttl_seconds: DEFAULT_TTL_SECONDS })
    }

    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    fn key(workflow_id: Uuid) -> String {
        format!("workflow:realtime:{workflow_id}")
    }

    fn channel(workflow_id: Uuid) -> String {
        format!("workflow:updates:{workflow_id}")
    }
}

#[async_trait]
impl Tracker for RedisTracker {
    async fn track(&self, workflow_id: Uuid, snapshot: &ContextSnapshot) {
        let payload = match serde_json::to_string(snapshot) {
            Ok(p) => p,
            Err(e) => {
                warn!(workflow_id = %workflow_id, "failed to serialize context snapshot: {e}");
                return;
            }
        };

        let mut conn = self.manager.clone();
        let key = Self::key(workflow_id);
        let channel = Self::channel(workflow_id);
        let ttl = self.ttl_seconds;

        let result: redis::RedisResult<()> = async move {
            conn.set_ex::<_, _, ()>(&key, &payload, ttl).await?;
            conn.publish::<_, _, ()>(&channel, &payload).await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!(workflow_id = %workflow_id, "tracker failed to mirror snapshot to redis: {e}");
        }
    }
}
