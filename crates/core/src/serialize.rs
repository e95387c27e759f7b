//! Job (de)serialization contract for the out-of-process runner (spec
//! §4.F, §6): `toArray -> {class, id, data?}`, `fromArray` symmetric via
//! [`JobRegistry`].
//!
//! The registry is the one process-wide piece of long-lived state this
//! engine needs (design note "Global mutable state"): built once when the
//! worker process starts and treated as read-only afterwards.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::job::Job;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub class: String,
    pub id: String,
    pub data: Option<Value>,
}

#[derive(Debug, Error)]
pub enum JobRegistryError {
    #[error("no job class registered for '{0}'")]
    UnknownClass(String),
    #[error("failed to construct job '{class}': {message}")]
    ConstructionFailed { class: String, message: String },
}

pub type JobFactory = Arc<dyn Fn(&JobDescriptor) -> Result<Arc<dyn Job>, JobRegistryError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct JobRegistry {
    factories: HashMap<String, JobFactory>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: impl Into<String>, factory: JobFactory) {
        self.factories.insert(class.into(), factory);
    }

    pub fn instantiate(&self, descriptor: &JobDescriptor) -> Result<Arc<dyn Job>, JobRegistryError> {
        let factory = self
            .factories
            .get(descriptor.class.as_str())
            .ok_or_else(|| JobRegistryError::UnknownClass(descriptor.class.clone()))?;
        factory(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockJob;
    use serde_json::json;

    #[test]
    fn unregistered_class_is_rejected() {
        let registry = JobRegistry::new();
        let descriptor = JobDescriptor {
            class: "ghost".into(),
            id: "x".into(),
            data: None,
        };
        assert!(matches!(registry.instantiate(&descriptor), Err(JobRegistryError::UnknownClass(c)) if c == "ghost"));
    }

    #[test]
    fn registered_factory_round_trips() {
        let mut registry = JobRegistry::new();
        registry.register(
            "mock",
            Arc::new(|descriptor: &JobDescriptor| {
                let value = descriptor.data.clone().unwrap_or(json!({}));
                Ok(Arc::new(MockJob::returning(descriptor.id.clone(), value)) as Arc<dyn Job>)
            }),
        );

        let descriptor = JobDescriptor {
            class: "mock".into(),
            id: "echo".into(),
            data: Some(json!({"ok": true})),
        };
        let job = registry.instantiate(&descriptor).expect("should construct");
        assert_eq!(job.id(), "echo");
    }
}
