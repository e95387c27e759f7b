//! `workflow-tracker` — the `Tracker` observer's Redis-backed
//! implementation (spec §4.E).

pub mod redis_tracker;

pub use redis_tracker::{RedisTracker, TrackerConnectError};
