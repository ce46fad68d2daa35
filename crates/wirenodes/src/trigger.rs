use async_trait::async_trait;
use wirecore::{ExecutionContext, ExecutorMetadata, NodeContext, NodeError, NodeExecutor, NodeType};

/// Trigger nodes do their work before the run starts (accepting the
/// click, form submission or Stripe event that seeded the context), so
/// during the walk they only report status and pass the context on.
pub struct TriggerExecutor {
    node_type: NodeType,
}

impl TriggerExecutor {
    pub fn manual() -> Self {
        Self {
            node_type: NodeType::ManualTrigger,
        }
    }

    pub fn google_form() -> Self {
        Self {
            node_type: NodeType::GoogleFormTrigger,
        }
    }

    pub fn stripe() -> Self {
        Self {
            node_type: NodeType::StripeTrigger,
        }
    }
}

#[async_trait]
impl NodeExecutor for TriggerExecutor {
    fn node_type(&self) -> NodeType {
        self.node_type
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        ctx.status.loading();
        ctx.status.success();
        Ok(ctx.context)
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: match self.node_type {
                NodeType::GoogleFormTrigger => "Runs when a Google Form is submitted",
                NodeType::StripeTrigger => "Runs when a Stripe event is received",
                _ => "Runs when started by hand",
            },
            category: "trigger",
        }
    }
}

/// Placeholder node of a freshly created workflow
pub struct InitialExecutor;

#[async_trait]
impl NodeExecutor for InitialExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Initial
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        Ok(ctx.context)
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Empty starting point",
            category: "trigger",
        }
    }
}
