use crate::{ExecutionContext, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type ExecutionId = String;
pub type EventId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(ExecutionStatus::Running),
            "SUCCESS" => Ok(ExecutionStatus::Success),
            "FAILED" => Ok(ExecutionStatus::Failed),
            other => Err(format!("unknown execution status '{}'", other)),
        }
    }
}

/// Persisted record of one workflow run.
///
/// Created in `RUNNING` when the run starts and written once more when it
/// reaches `SUCCESS` or `FAILED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    /// Id of the triggering event; unique, the idempotency key of the run.
    pub event_id: EventId,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub error_stack: Option<String>,
}

impl Execution {
    pub fn started(event_id: impl Into<EventId>, workflow_id: impl Into<WorkflowId>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            event_id: event_id.into(),
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            output: None,
            error: None,
            error_stack: None,
        }
    }

    /// Final context of a successful run.
    pub fn output_context(&self) -> Option<ExecutionContext> {
        self.output
            .clone()
            .and_then(|output| ExecutionContext::try_from(output).ok())
    }
}

/// Request to run a workflow.
///
/// The event id doubles as the execution's idempotency key, so delivering
/// the same event twice never produces two runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub id: EventId,
    pub workflow_id: WorkflowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<Map<String, Value>>,
}

impl RunEvent {
    pub fn new(workflow_id: impl Into<WorkflowId>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            initial_data: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_initial_data(mut self, data: Map<String, Value>) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Context the first node starts from.
    pub fn initial_context(&self) -> ExecutionContext {
        self.initial_data.clone().map(ExecutionContext::from).unwrap_or_default()
    }
}
