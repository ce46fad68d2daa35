use crate::{EventId, ExecutionStatus, NodeId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Topic every node status message is published under
pub const STATUS_TOPIC: &str = "status";

/// Lifecycle state of one node as shown to the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    pub node_id: NodeId,
    pub status: NodeStatus,
}

/// Message published on a node type's status channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub channel: String,
    pub topic: String,
    pub data: StatusData,
    pub created_at: DateTime<Utc>,
}

/// Events emitted during workflow execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExecutionEvent {
    #[serde(rename_all = "camelCase")]
    ExecutionStarted {
        event_id: EventId,
        workflow_id: WorkflowId,
        timestamp: DateTime<Utc>,
    },
    Status(StatusMessage),
    #[serde(rename_all = "camelCase")]
    ExecutionCompleted {
        event_id: EventId,
        workflow_id: WorkflowId,
        status: ExecutionStatus,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    /// Status channel this event belongs to, if it is a node status.
    pub fn channel(&self) -> Option<&str> {
        match self {
            ExecutionEvent::Status(message) => Some(&message.channel),
            _ => None,
        }
    }
}

/// Fire-and-forget destination for execution events.
///
/// Publishing never fails the run; sinks log and drop what they cannot deliver.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ExecutionEvent);
}

/// Status publisher handed to a single node
#[derive(Clone)]
pub struct StatusEmitter {
    channel: &'static str,
    node_id: NodeId,
    sink: Arc<dyn EventSink>,
}

impl StatusEmitter {
    pub fn new(channel: &'static str, node_id: NodeId, sink: Arc<dyn EventSink>) -> Self {
        Self {
            channel,
            node_id,
            sink,
        }
    }

    pub fn channel(&self) -> &'static str {
        self.channel
    }

    pub fn emit(&self, status: NodeStatus) {
        tracing::trace!("{} -> {:?} on {}", self.node_id, status, self.channel);
        self.sink.publish(ExecutionEvent::Status(StatusMessage {
            channel: self.channel.to_string(),
            topic: STATUS_TOPIC.to_string(),
            data: StatusData {
                node_id: self.node_id.clone(),
                status,
            },
            created_at: Utc::now(),
        }));
    }

    pub fn loading(&self) {
        self.emit(NodeStatus::Loading);
    }

    pub fn success(&self) {
        self.emit(NodeStatus::Success);
    }

    pub fn error(&self) {
        self.emit(NodeStatus::Error);
    }
}

/// In-process event bus.
///
/// Local subscribers receive events over a broadcast channel; forwarders
/// (for example an Iggy stream) get a copy of every event as well.
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
    forwarders: Vec<Arc<dyn EventSink>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            forwarders: Vec::new(),
        }
    }

    pub fn with_forwarder(mut self, forwarder: Arc<dyn EventSink>) -> Self {
        self.forwarders.push(forwarder);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to the status messages of one channel only.
    pub fn subscribe_channel(&self, channel: impl Into<String>) -> ChannelSubscription {
        ChannelSubscription {
            channel: channel.into(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn emit(&self, event: ExecutionEvent) {
        for forwarder in &self.forwarders {
            forwarder.publish(event.clone());
        }
        // No receivers is not an error
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(self: &Arc<Self>, channel: &'static str, node_id: NodeId) -> StatusEmitter {
        StatusEmitter::new(channel, node_id, self.clone())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: ExecutionEvent) {
        self.emit(event);
    }
}

/// Receiver yielding only the status messages of one channel
pub struct ChannelSubscription {
    channel: String,
    receiver: broadcast::Receiver<ExecutionEvent>,
}

impl ChannelSubscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Next message on the channel, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<StatusMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(ExecutionEvent::Status(message)) if message.channel == self.channel => {
                    return Some(message)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Subscriber on {} lagged, skipped {} events", self.channel, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ExecutionEvent>>);

    impl EventSink for Collect {
        fn publish(&self, event: ExecutionEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn channel_subscription_filters_other_channels() {
        let bus = Arc::new(EventBus::new(16));
        let mut http = bus.subscribe_channel("http-request-execution");

        bus.create_emitter("discord-execution", "d1".into()).loading();
        bus.create_emitter("http-request-execution", "h1".into()).success();

        let message = http.recv().await.unwrap();
        assert_eq!(message.data.node_id, "h1");
        assert_eq!(message.data.status, NodeStatus::Success);
        assert_eq!(message.topic, STATUS_TOPIC);
    }

    #[tokio::test]
    async fn forwarders_see_every_event() {
        let forward = Arc::new(Collect::default());
        let bus = Arc::new(EventBus::new(16).with_forwarder(forward.clone()));

        let emitter = bus.create_emitter("slack-execution", "s1".into());
        emitter.loading();
        emitter.error();

        let seen = forward.0.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].channel(), Some("slack-execution"));
    }

    #[test]
    fn status_message_wire_shape() {
        let event = ExecutionEvent::Status(StatusMessage {
            channel: "openai-execution".into(),
            topic: STATUS_TOPIC.into(),
            data: StatusData {
                node_id: "n1".into(),
                status: NodeStatus::Loading,
            },
            created_at: Utc::now(),
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("status"));
        assert_eq!(value["data"], json!({ "nodeId": "n1", "status": "loading" }));
    }
}
