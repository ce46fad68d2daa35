use crate::{NodeError, StoreError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Storage for completed step results of a run.
#[async_trait]
pub trait StepStore: Send + Sync {
    async fn load(&self, run_key: &str, step_id: &str) -> Result<Option<Value>, StoreError>;

    async fn save(&self, run_key: &str, step_id: &str, value: &Value) -> Result<(), StoreError>;

    /// Drop every recorded step of a run once it can no longer be replayed.
    async fn clear(&self, run_key: &str) -> Result<(), StoreError>;
}

/// Handle executors use to wrap side effects.
///
/// A step that already completed in an earlier attempt of the same run is
/// not executed again; its recorded result is returned instead.
#[derive(Clone)]
pub struct StepTools {
    run_key: String,
    scope: String,
    store: Arc<dyn StepStore>,
}

impl StepTools {
    pub fn new(run_key: impl Into<String>, store: Arc<dyn StepStore>) -> Self {
        Self {
            run_key: run_key.into(),
            scope: String::new(),
            store,
        }
    }

    /// Handle whose step ids are prefixed with `scope` (a node id).
    pub fn scoped(&self, scope: impl Into<String>) -> Self {
        Self {
            run_key: self.run_key.clone(),
            scope: scope.into(),
            store: self.store.clone(),
        }
    }

    pub fn run_key(&self) -> &str {
        &self.run_key
    }

    pub fn step_id(&self, name: &str) -> String {
        if self.scope.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.scope, name)
        }
    }

    /// Run `f` once per run and return its (possibly recorded) result.
    pub async fn run<T, F, Fut>(&self, name: &str, f: F) -> Result<T, NodeError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, NodeError>>,
    {
        let step_id = self.step_id(name);

        let recorded = self
            .store
            .load(&self.run_key, &step_id)
            .await
            .map_err(|e| step_error(&step_id, e))?;

        if let Some(value) = recorded {
            tracing::debug!("Replaying recorded step {} for run {}", step_id, self.run_key);
            return serde_json::from_value(value).map_err(|e| step_error(&step_id, e));
        }

        let result = f().await?;

        let value = serde_json::to_value(&result).map_err(|e| step_error(&step_id, e))?;
        self.store
            .save(&self.run_key, &step_id, &value)
            .await
            .map_err(|e| step_error(&step_id, e))?;

        tracing::debug!("Recorded step {} for run {}", step_id, self.run_key);
        Ok(result)
    }
}

fn step_error(step_id: &str, error: impl std::fmt::Display) -> NodeError {
    NodeError::Step {
        step: step_id.to_string(),
        message: error.to_string(),
    }
}
