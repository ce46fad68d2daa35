use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use wirecore::{
    Credential, CredentialStore, Execution, ExecutionStatus, ExecutionStore, StepStore,
    StoreError, Workflow, WorkflowStore,
};

/// Volatile implementation of every store trait.
///
/// Used by tests and by `wire run` when no database is given.
#[derive(Default)]
pub struct MemoryStore {
    workflows: RwLock<HashMap<String, Workflow>>,
    /// Keyed by event id
    executions: RwLock<HashMap<String, Execution>>,
    steps: RwLock<HashMap<(String, String), Value>>,
    credentials: RwLock<HashMap<String, Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_credential(&self, credential: Credential) {
        self.credentials
            .write()
            .await
            .insert(credential.id.clone(), credential);
    }

    async fn finish(
        &self,
        event_id: &str,
        apply: impl FnOnce(&mut Execution),
    ) -> Result<bool, StoreError> {
        let mut executions = self.executions.write().await;
        match executions.get_mut(event_id) {
            Some(execution) if execution.status == ExecutionStatus::Running => {
                apply(execution);
                execution.completed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.read().await.get(id).cloned())
    }

    async fn save_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        self.workflows
            .write()
            .await
            .insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        let mut workflows: Vec<Workflow> = self.workflows.read().await.values().cloned().collect();
        workflows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workflows)
    }

    async fn delete_workflow(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.workflows.write().await.remove(id).is_some();
        if removed {
            let mut executions = self.executions.write().await;
            let run_keys: HashSet<String> = executions
                .iter()
                .filter(|(_, execution)| execution.workflow_id == id)
                .map(|(event_id, _)| event_id.clone())
                .collect();
            executions.retain(|event_id, _| !run_keys.contains(event_id));
            self.steps
                .write()
                .await
                .retain(|(run_key, _), _| !run_keys.contains(run_key));
        }
        Ok(removed)
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn create_if_absent(
        &self,
        event_id: &str,
        workflow_id: &str,
    ) -> Result<(Execution, bool), StoreError> {
        let mut executions = self.executions.write().await;
        if let Some(existing) = executions.get(event_id) {
            return Ok((existing.clone(), false));
        }

        let execution = Execution::started(event_id, workflow_id);
        executions.insert(event_id.to_string(), execution.clone());
        Ok((execution, true))
    }

    async fn mark_succeeded(&self, event_id: &str, output: &Value) -> Result<bool, StoreError> {
        self.finish(event_id, |execution| {
            execution.status = ExecutionStatus::Success;
            execution.output = Some(output.clone());
        })
        .await
    }

    async fn mark_failed(
        &self,
        event_id: &str,
        error: &str,
        stack: &str,
    ) -> Result<bool, StoreError> {
        self.finish(event_id, |execution| {
            execution.status = ExecutionStatus::Failed;
            execution.error = Some(error.to_string());
            execution.error_stack = Some(stack.to_string());
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<Execution>, StoreError> {
        Ok(self
            .executions
            .read()
            .await
            .values()
            .find(|execution| execution.id == id)
            .cloned())
    }

    async fn get_by_event(&self, event_id: &str) -> Result<Option<Execution>, StoreError> {
        Ok(self.executions.read().await.get(event_id).cloned())
    }

    async fn list_for_workflow(&self, workflow_id: &str) -> Result<Vec<Execution>, StoreError> {
        let mut executions: Vec<Execution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|execution| execution.workflow_id == workflow_id)
            .cloned()
            .collect();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(executions)
    }
}

#[async_trait]
impl StepStore for MemoryStore {
    async fn load(&self, run_key: &str, step_id: &str) -> Result<Option<Value>, StoreError> {
        let steps = self.steps.read().await;
        Ok(steps.get(&(run_key.to_string(), step_id.to_string())).cloned())
    }

    async fn save(&self, run_key: &str, step_id: &str, value: &Value) -> Result<(), StoreError> {
        self.steps
            .write()
            .await
            .insert((run_key.to_string(), step_id.to_string()), value.clone());
        Ok(())
    }

    async fn clear(&self, run_key: &str) -> Result<(), StoreError> {
        self.steps.write().await.retain(|(key, _), _| key != run_key);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_credential(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Credential>, StoreError> {
        let credentials = self.credentials.read().await;
        Ok(credentials
            .get(id)
            .filter(|credential| credential.owner_id == owner_id)
            .cloned())
    }
}

/// The set of stores a runtime works against
#[derive(Clone)]
pub struct Stores {
    pub workflows: Arc<dyn WorkflowStore>,
    pub executions: Arc<dyn ExecutionStore>,
    pub steps: Arc<dyn StepStore>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl Stores {
    /// Use one backend for everything.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: WorkflowStore + ExecutionStore + StepStore + CredentialStore + 'static,
    {
        Self {
            workflows: store.clone(),
            executions: store.clone(),
            steps: store.clone(),
            credentials: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::shared(Arc::new(MemoryStore::new()))
    }
}
