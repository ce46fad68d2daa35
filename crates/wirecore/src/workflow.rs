use crate::{NodeConfig, WorkflowError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type WorkflowId = String;
pub type NodeId = String;
pub type UserId = String;

/// Complete workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    /// Owning user; credential lookups during a run are scoped to it.
    pub owner: UserId,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, owner: impl Into<UserId>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            owner: owner.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<WorkflowId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn add_node(&mut self, node: NodeSpec) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    /// Add a directed edge. Adding the same edge twice is a no-op.
    pub fn connect(&mut self, from_node_id: impl Into<NodeId>, to_node_id: impl Into<NodeId>) {
        let connection = Connection {
            from_node_id: from_node_id.into(),
            to_node_id: to_node_id.into(),
        };
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
        }
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Node specification in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub data: NodeConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl NodeSpec {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            node_type,
            data: NodeConfig::new(),
            position: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key, value);
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position { x, y });
        self
    }
}

/// Directed dependency between two nodes of the same workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
}

/// Node position in the visual editor; never read during execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// The fixed set of node types an executor can exist for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Initial,
    ManualTrigger,
    GoogleFormTrigger,
    StripeTrigger,
    HttpRequest,
    Anthropic,
    #[serde(rename = "OPENAI")]
    OpenAi,
    Gemini,
    Discord,
    Slack,
}

impl NodeType {
    pub const ALL: [NodeType; 10] = [
        NodeType::Initial,
        NodeType::ManualTrigger,
        NodeType::GoogleFormTrigger,
        NodeType::StripeTrigger,
        NodeType::HttpRequest,
        NodeType::Anthropic,
        NodeType::OpenAi,
        NodeType::Gemini,
        NodeType::Discord,
        NodeType::Slack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Initial => "INITIAL",
            NodeType::ManualTrigger => "MANUAL_TRIGGER",
            NodeType::GoogleFormTrigger => "GOOGLE_FORM_TRIGGER",
            NodeType::StripeTrigger => "STRIPE_TRIGGER",
            NodeType::HttpRequest => "HTTP_REQUEST",
            NodeType::Anthropic => "ANTHROPIC",
            NodeType::OpenAi => "OPENAI",
            NodeType::Gemini => "GEMINI",
            NodeType::Discord => "DISCORD",
            NodeType::Slack => "SLACK",
        }
    }

    /// Name used in user-facing error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::Initial => "Initial",
            NodeType::ManualTrigger => "Manual Trigger",
            NodeType::GoogleFormTrigger => "Google Form Trigger",
            NodeType::StripeTrigger => "Stripe Trigger",
            NodeType::HttpRequest => "HTTP Request",
            NodeType::Anthropic => "Anthropic",
            NodeType::OpenAi => "OpenAI",
            NodeType::Gemini => "Gemini",
            NodeType::Discord => "Discord",
            NodeType::Slack => "Slack",
        }
    }

    /// Realtime channel carrying this node type's status topic.
    pub fn status_channel(&self) -> &'static str {
        match self {
            NodeType::Initial => "initial-execution",
            NodeType::ManualTrigger => "manual-trigger-execution",
            NodeType::GoogleFormTrigger => "google-form-trigger-execution",
            NodeType::StripeTrigger => "stripe-trigger-execution",
            NodeType::HttpRequest => "http-request-execution",
            NodeType::Anthropic => "anthropic-execution",
            NodeType::OpenAi => "openai-execution",
            NodeType::Gemini => "gemini-execution",
            NodeType::Discord => "discord-execution",
            NodeType::Slack => "slack-execution",
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            NodeType::ManualTrigger | NodeType::GoogleFormTrigger | NodeType::StripeTrigger
        )
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| WorkflowError::UnknownNodeType(s.to_string()))
    }
}
