use crate::graph::topological_sort;
use crate::memory::Stores;
use crate::registry::ExecutorRegistry;
use crate::runtime::RuntimeConfig;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use wirecore::{
    error_chain, EventSink, Execution, ExecutionContext, ExecutionEvent, ExecutionStatus,
    FlowError, NodeContext, NodeExecutor, NodeSpec, NodeType, RunEvent, StatusEmitter, StepTools,
    Workflow, WorkflowError,
};

/// Outcome of a run request
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub execution: Execution,
    /// Final context of the run
    pub output: ExecutionContext,
    /// True when the event had already completed and nothing was run
    pub replayed: bool,
}

/// Drives a workflow run from trigger event to terminal execution record.
///
/// The run is walked sequentially in graph order, each executor receiving
/// the context returned by the previous one. A retriable failure restarts
/// the walk after a back-off; memoised steps make the restart cheap and
/// keep completed side effects from repeating.
pub struct Orchestrator {
    registry: Arc<ExecutorRegistry>,
    stores: Stores,
    events: Arc<dyn EventSink>,
    config: RuntimeConfig,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ExecutorRegistry>,
        stores: Stores,
        events: Arc<dyn EventSink>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            registry,
            stores,
            events,
            config,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    /// Run the workflow named by `event`.
    ///
    /// Delivering the same event again is safe: a finished execution is
    /// returned as recorded, an unfinished one is resumed.
    #[instrument(skip(self, event), fields(workflow_id = %event.workflow_id, event_id = %event.id))]
    pub async fn run(&self, event: RunEvent) -> Result<ExecutionResult, FlowError> {
        let workflow = self
            .stores
            .workflows
            .get_workflow(&event.workflow_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(event.workflow_id.clone()))?;

        let (execution, created) = self
            .stores
            .executions
            .create_if_absent(&event.id, &workflow.id)
            .await?;

        // An event id belongs to the workflow that first recorded it
        if execution.workflow_id != workflow.id {
            warn!(
                "Event {} is recorded for workflow {}, refusing to run {}",
                event.id, execution.workflow_id, workflow.id
            );
            return Err(FlowError::EventConflict {
                event_id: event.id.clone(),
                recorded_workflow_id: execution.workflow_id,
            });
        }

        if !created {
            match execution.status {
                ExecutionStatus::Success => {
                    info!("Event already processed, returning recorded execution {}", execution.id);
                    let output = execution.output_context().unwrap_or_default();
                    return Ok(ExecutionResult {
                        execution,
                        output,
                        replayed: true,
                    });
                }
                ExecutionStatus::Failed => {
                    return Err(FlowError::AlreadyFailed {
                        message: execution.error.clone().unwrap_or_default(),
                        execution_id: execution.id,
                    });
                }
                ExecutionStatus::Running => {
                    info!("Resuming unfinished execution {}", execution.id);
                }
            }
        }

        if workflow.nodes.len() > 1
            && workflow.nodes.iter().any(|n| n.node_type == NodeType::Initial)
        {
            warn!("Workflow {} still contains a placeholder INITIAL node", workflow.id);
        }

        let started = Instant::now();
        self.events.publish(ExecutionEvent::ExecutionStarted {
            event_id: event.id.clone(),
            workflow_id: workflow.id.clone(),
            timestamp: Utc::now(),
        });

        let result = match self.run_with_retry(&workflow, &event).await {
            Ok(output) => self.on_success(&event, output).await,
            Err(err) => Err(err),
        };

        // Also covers a store failure while recording success
        if let Err(err) = &result {
            self.on_failure(&event, err).await;
        }

        let status = if result.is_ok() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };

        self.events.publish(ExecutionEvent::ExecutionCompleted {
            event_id: event.id.clone(),
            workflow_id: workflow.id.clone(),
            status,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });

        result
    }

    async fn run_with_retry(
        &self,
        workflow: &Workflow,
        event: &RunEvent,
    ) -> Result<ExecutionContext, FlowError> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.attempt(workflow, event).await {
                Ok(output) => return Ok(output),

                Err(err) if !err.is_retriable() => {
                    debug!("Permanent failure on attempt {}: {}", attempts, err);
                    return Err(err);
                }

                Err(err) => {
                    if attempts > self.config.max_retries {
                        error!("Giving up after {} attempts: {}", attempts, err);
                        return Err(err);
                    }

                    let delay = self.config.retry_delay(attempts);
                    warn!(
                        "Attempt {}/{} failed, retrying in {:?}: {}",
                        attempts,
                        self.config.max_retries + 1,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One walk over the ordered nodes.
    async fn attempt(
        &self,
        workflow: &Workflow,
        event: &RunEvent,
    ) -> Result<ExecutionContext, FlowError> {
        let ordered = topological_sort(&workflow.nodes, &workflow.connections)?;

        // Resolve everything up front so an unknown type fails before any side effect
        let plan = ordered
            .into_iter()
            .map(|node| Ok((node, self.registry.resolve(node.node_type)?)))
            .collect::<Result<Vec<(&NodeSpec, Arc<dyn NodeExecutor>)>, WorkflowError>>()?;

        let steps = StepTools::new(event.id.clone(), self.stores.steps.clone());
        let mut context = event.initial_context();

        for (node, executor) in plan {
            info!("Executing node {} ({})", node.id, node.node_type);

            let node_ctx = NodeContext {
                node_id: node.id.clone(),
                node_type: node.node_type,
                data: node.data.clone(),
                context,
                step: steps.scoped(node.id.clone()),
                status: StatusEmitter::new(
                    node.node_type.status_channel(),
                    node.id.clone(),
                    self.events.clone(),
                ),
                user_id: workflow.owner.clone(),
                credentials: self.stores.credentials.clone(),
            };

            context = executor.execute(node_ctx).await.map_err(|e| {
                warn!("Node {} failed: {}", node.id, e);
                FlowError::from(e)
            })?;
        }

        Ok(context)
    }

    async fn on_success(
        &self,
        event: &RunEvent,
        output: ExecutionContext,
    ) -> Result<ExecutionResult, FlowError> {
        let value = output.clone().into_value();
        if self.stores.executions.mark_succeeded(&event.id, &value).await? {
            self.clear_steps(event).await;
        } else {
            warn!("Execution for event {} was already terminal", event.id);
        }

        let execution = self
            .stores
            .executions
            .get_by_event(&event.id)
            .await?
            .ok_or_else(|| FlowError::Execution(format!("execution for event {} vanished", event.id)))?;

        info!("Execution {} succeeded", execution.id);
        Ok(ExecutionResult {
            execution,
            output,
            replayed: false,
        })
    }

    /// Record the terminal failure. The RUNNING-only transition in the
    /// store makes this a no-op for anything but the first call.
    async fn on_failure(&self, event: &RunEvent, err: &FlowError) {
        let message = err.to_string();
        let stack = error_chain(err);

        match self
            .stores
            .executions
            .mark_failed(&event.id, &message, &stack)
            .await
        {
            Ok(true) => {
                error!("Execution for event {} failed: {}", event.id, message);
                self.clear_steps(event).await;
            }
            Ok(false) => debug!("Failure for event {} already recorded", event.id),
            Err(store_err) => error!(
                "Could not record failure for event {}: {} (original error: {})",
                event.id, store_err, message
            ),
        }
    }

    /// A terminal run is never walked again, so its step log can go.
    async fn clear_steps(&self, event: &RunEvent) {
        if let Err(e) = self.stores.steps.clear(&event.id).await {
            warn!("Could not clear steps of event {}: {}", event.id, e);
        }
    }
}

impl RuntimeConfig {
    /// Back-off before the attempt following `attempt`: base, 2x base, 4x base...
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let base = Duration::from_millis(self.retry_base_delay_ms);
        base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let config = RuntimeConfig {
            retry_base_delay_ms: 100,
            ..RuntimeConfig::default()
        };
        assert_eq!(config.retry_delay(1), Duration::from_millis(100));
        assert_eq!(config.retry_delay(2), Duration::from_millis(200));
        assert_eq!(config.retry_delay(3), Duration::from_millis(400));
    }
}
