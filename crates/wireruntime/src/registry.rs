use std::collections::HashMap;
use std::sync::Arc;
use wirecore::{ExecutorMetadata, NodeExecutor, NodeType, WorkflowError};

/// Registry of available node executors, keyed by node type
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<NodeType, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor; a later registration for the same type wins.
    pub fn register(&mut self, executor: Arc<dyn NodeExecutor>) {
        let node_type = executor.node_type();
        tracing::info!("Registering node type: {}", node_type);
        if self.executors.insert(node_type, executor).is_some() {
            tracing::warn!("Replaced existing executor for {}", node_type);
        }
    }

    pub fn resolve(&self, node_type: NodeType) -> Result<Arc<dyn NodeExecutor>, WorkflowError> {
        self.executors
            .get(&node_type)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownNodeType(node_type.to_string()))
    }

    pub fn contains(&self, node_type: NodeType) -> bool {
        self.executors.contains_key(&node_type)
    }

    /// Registered node types in declaration order
    pub fn list_node_types(&self) -> Vec<NodeType> {
        NodeType::ALL
            .into_iter()
            .filter(|t| self.executors.contains_key(t))
            .collect()
    }

    pub fn get_metadata(&self, node_type: NodeType) -> Option<ExecutorMetadata> {
        self.executors.get(&node_type).map(|e| e.metadata())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wirecore::{ExecutionContext, NodeContext, NodeError};

    struct Passthrough(NodeType);

    #[async_trait]
    impl NodeExecutor for Passthrough {
        fn node_type(&self) -> NodeType {
            self.0
        }

        async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
            Ok(ctx.context)
        }
    }

    #[test]
    fn unknown_types_are_reported() {
        let mut registry = ExecutorRegistry::new();
        registry.register(Arc::new(Passthrough(NodeType::Slack)));

        assert!(registry.resolve(NodeType::Slack).is_ok());
        let err = registry.resolve(NodeType::Gemini).err().unwrap();
        assert_eq!(err.to_string(), "No executor found for node type: GEMINI");
    }

    #[test]
    fn listing_follows_declaration_order() {
        let mut registry = ExecutorRegistry::new();
        registry.register(Arc::new(Passthrough(NodeType::Slack)));
        registry.register(Arc::new(Passthrough(NodeType::Initial)));
        registry.register(Arc::new(Passthrough(NodeType::HttpRequest)));

        assert_eq!(
            registry.list_node_types(),
            vec![NodeType::Initial, NodeType::HttpRequest, NodeType::Slack]
        );
    }
}
