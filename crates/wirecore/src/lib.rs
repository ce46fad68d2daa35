//! Core abstractions for the wireflow execution engine
//!
//! Workflow and execution models, the executor trait, templating, the
//! durable step handle, status events and the storage seams. Everything
//! else in the workspace builds on this crate.

mod context;
mod credential;
mod error;
pub mod events;
mod execution;
mod node;
pub mod step;
pub mod store;
pub mod template;
pub mod trigger;
mod workflow;

pub use context::{ExecutionContext, NodeConfig};
pub use credential::{Credential, CredentialType};
pub use error::{error_chain, FlowError, NodeError, StoreError, TemplateError, WorkflowError};
pub use events::{EventBus, EventSink, ExecutionEvent, NodeStatus, StatusEmitter, StatusMessage};
pub use execution::{EventId, Execution, ExecutionId, ExecutionStatus, RunEvent};
pub use node::{ExecutorMetadata, NodeContext, NodeExecutor};
pub use step::{StepStore, StepTools};
pub use store::{CredentialStore, ExecutionStore, WorkflowStore};
pub use workflow::{Connection, NodeId, NodeSpec, NodeType, Position, UserId, Workflow, WorkflowId};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
