//! Persistence seams used by the runtime.
//!
//! Implementations live elsewhere: in-memory ones in `wireruntime`,
//! SQLite in `wirestore`.

use crate::{Credential, Execution, StoreError, Workflow};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError>;

    async fn save_workflow(&self, workflow: &Workflow) -> Result<(), StoreError>;

    async fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError>;

    /// Remove a workflow together with its executions.
    async fn delete_workflow(&self, id: &str) -> Result<bool, StoreError>;
}

/// Durable log of runs, keyed by triggering event id.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert a `RUNNING` record for `event_id` unless one exists.
    ///
    /// Returns the stored record and whether this call created it.
    async fn create_if_absent(
        &self,
        event_id: &str,
        workflow_id: &str,
    ) -> Result<(Execution, bool), StoreError>;

    /// `RUNNING` → `SUCCESS`. Returns false when the record was already
    /// terminal (or missing) and nothing changed.
    async fn mark_succeeded(&self, event_id: &str, output: &Value) -> Result<bool, StoreError>;

    /// `RUNNING` → `FAILED`. Same transition guard as `mark_succeeded`.
    async fn mark_failed(&self, event_id: &str, error: &str, stack: &str)
        -> Result<bool, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Execution>, StoreError>;

    async fn get_by_event(&self, event_id: &str) -> Result<Option<Execution>, StoreError>;

    /// Executions of a workflow, newest first.
    async fn list_for_workflow(&self, workflow_id: &str) -> Result<Vec<Execution>, StoreError>;
}

/// Secret lookup.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Decrypted credential `id`, but only when `owner_id` owns it.
    async fn get_credential(&self, id: &str, owner_id: &str)
        -> Result<Option<Credential>, StoreError>;
}
