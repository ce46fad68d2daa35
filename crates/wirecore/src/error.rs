use thiserror::Error;

/// Top-level error for a workflow run.
///
/// Anything that is not explicitly retriable is treated as a permanent
/// failure by the orchestrator: it is written to the execution record
/// straight away instead of being retried.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Execution {execution_id} already failed: {message}")]
    AlreadyFailed {
        execution_id: String,
        message: String,
    },

    #[error("Event {event_id} already started a run of workflow {recorded_workflow_id}")]
    EventConflict {
        event_id: String,
        recorded_workflow_id: String,
    },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    pub fn is_retriable(&self) -> bool {
        match self {
            FlowError::Node(e) => e.is_retriable(),
            FlowError::Store(e) => e.is_retriable(),
            FlowError::Execution(_) => true,
            FlowError::Workflow(_)
            | FlowError::AlreadyFailed { .. }
            | FlowError::EventConflict { .. }
            | FlowError::Serialization(_) => false,
        }
    }
}

/// Failure raised by a node executor.
///
/// `node` is always the human readable node type ("HTTP Request",
/// "Anthropic", ...) so that the persisted message says where the run
/// stopped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("{node} node: {field} is not configured")]
    MissingConfig {
        node: &'static str,
        field: &'static str,
    },

    #[error("{node} node: {message}")]
    Configuration { node: &'static str, message: String },

    #[error("{node} node: credential not found")]
    CredentialNotFound { node: &'static str },

    #[error("{node} node: credential lookup failed: {message}")]
    CredentialLookup { node: &'static str, message: String },

    #[error("{node} node: request body is not valid JSON: {message}")]
    InvalidBody { node: &'static str, message: String },

    #[error("{node} node: {source}")]
    Template {
        node: &'static str,
        #[source]
        source: TemplateError,
    },

    #[error("{node} node: request failed: {message}")]
    Request { node: &'static str, message: String },

    #[error("{node} node: provider call failed: {message}")]
    Provider { node: &'static str, message: String },

    #[error("step '{step}' could not be recorded: {message}")]
    Step { step: String, message: String },
}

impl NodeError {
    /// Transient failures may be retried by the orchestrator; everything
    /// caused by configuration or data is permanent.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            NodeError::CredentialLookup { .. }
                | NodeError::Request { .. }
                | NodeError::Provider { .. }
                | NodeError::Step { .. }
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("template could not be rendered: {0}")]
    Render(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Invalid workflow: {0}")]
    Invalid(String),

    #[error("Workflow contains a cycle")]
    CyclicDependency,

    #[error("Connection references unknown node: {0}")]
    NodeNotFound(String),

    #[error("No executor found for node type: {0}")]
    UnknownNodeType(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("backend failure: {0}")]
    Backend(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}

/// Render an error and its `source()` chain, one cause per line.
///
/// This is what gets persisted as the execution's error stack.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\n  caused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
