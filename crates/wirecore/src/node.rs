use crate::events::StatusEmitter;
use crate::step::StepTools;
use crate::store::CredentialStore;
use crate::{template, ExecutionContext, NodeConfig, NodeError, NodeId, NodeType, UserId};
use async_trait::async_trait;
use std::sync::Arc;

/// Runtime behaviour of one node type.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// The node type this executor is registered under
    fn node_type(&self) -> NodeType;

    /// Run the node and return the context the next node will see.
    ///
    /// Implementations publish `loading` first and exactly one of
    /// `success` / `error` before returning.
    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError>;

    /// Optional: description shown by node listings
    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata::default()
    }
}

/// Descriptive information about an executor
#[derive(Debug, Clone, Default)]
pub struct ExecutorMetadata {
    pub description: &'static str,
    pub category: &'static str,
}

/// Everything an executor gets to see for a single node invocation
#[derive(Clone)]
pub struct NodeContext {
    pub node_id: NodeId,
    pub node_type: NodeType,

    /// The node's configuration payload
    pub data: NodeConfig,

    /// Context produced by the nodes ordered before this one
    pub context: ExecutionContext,

    /// Memoising step handle scoped to this node
    pub step: StepTools,

    /// Status publisher for this node's channel
    pub status: StatusEmitter,

    /// Owner of the workflow; credential lookups are scoped to it
    pub user_id: UserId,

    pub credentials: Arc<dyn CredentialStore>,
}

impl NodeContext {
    fn node_name(&self) -> &'static str {
        self.node_type.display_name()
    }

    /// Publish `error` and hand the error back for propagation.
    pub fn fail(&self, error: NodeError) -> NodeError {
        self.status.error();
        error
    }

    /// Required configuration string, failing the node when it is unset.
    pub fn require_config(&self, field: &'static str) -> Result<&str, NodeError> {
        self.data.get_str(field).ok_or_else(|| {
            self.fail(NodeError::MissingConfig {
                node: self.node_name(),
                field,
            })
        })
    }

    /// Expand a template against the current context.
    pub fn render(&self, source: &str) -> Result<String, NodeError> {
        template::render(source, &self.context).map_err(|source| {
            self.fail(NodeError::Template {
                node: self.node_name(),
                source,
            })
        })
    }

    /// Optional templated field: `None` when unset.
    pub fn render_optional(&self, field: &str) -> Result<Option<String>, NodeError> {
        self.data
            .get_str(field)
            .map(|source| self.render(source))
            .transpose()
    }
}
