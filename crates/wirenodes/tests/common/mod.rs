#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use wirecore::{
    Credential, CredentialType, EventBus, ExecutionContext, ExecutionEvent, NodeContext,
    NodeStatus, NodeType, StatusEmitter, StepTools,
};
use wirenodes::transport::{HttpClient, OutboundRequest, OutboundResponse, TransportError};
use wireruntime::MemoryStore;

pub const OWNER: &str = "user-1";

/// Fake transport: records every request and answers from a queue.
#[derive(Default)]
pub struct RecordingClient {
    requests: Mutex<Vec<OutboundRequest>>,
    responses: Mutex<VecDeque<Result<OutboundResponse, TransportError>>>,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, response: Result<OutboundResponse, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn respond_json(&self, status: u16, body: Value) {
        self.respond(Ok(OutboundResponse {
            status,
            status_text: status_text(status).into(),
            content_type: Some("application/json".into()),
            body: body.to_string(),
        }));
    }

    pub fn respond_text(&self, status: u16, body: &str) {
        self.respond(Ok(OutboundResponse {
            status,
            status_text: status_text(status).into(),
            content_type: Some("text/plain; charset=utf-8".into()),
            body: body.into(),
        }));
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        401 => "Unauthorized",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[async_trait]
impl HttpClient for RecordingClient {
    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(OutboundResponse {
                status: 204,
                status_text: "No Content".into(),
                content_type: None,
                body: String::new(),
            })
        })
    }
}

/// Everything needed to call an executor directly.
pub struct Harness {
    pub bus: Arc<EventBus>,
    pub store: Arc<MemoryStore>,
    events: broadcast::Receiver<ExecutionEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new(64));
        let events = bus.subscribe();
        Self {
            bus,
            store: Arc::new(MemoryStore::new()),
            events,
        }
    }

    pub async fn with_credential(self, id: &str, owner: &str, credential_type: CredentialType) -> Self {
        self.store
            .insert_credential(Credential {
                id: id.into(),
                owner_id: owner.into(),
                name: format!("{} key", credential_type),
                credential_type,
                secret: format!("secret-{}", id),
            })
            .await;
        self
    }

    /// Context for node `node` of `node_type` under run key `run`.
    pub fn context(&self, run: &str, node_type: NodeType, data: Value, context: Value) -> NodeContext {
        let node_id = "node-1".to_string();
        let data = match data {
            Value::Object(map) => map.into(),
            _ => panic!("node data must be an object"),
        };
        let context = ExecutionContext::try_from(context).expect("context must be an object");

        NodeContext {
            node_id: node_id.clone(),
            node_type,
            data,
            context,
            step: StepTools::new(run, self.store.clone()).scoped(node_id.clone()),
            status: StatusEmitter::new(node_type.status_channel(), node_id, self.bus.clone()),
            user_id: OWNER.into(),
            credentials: self.store.clone(),
        }
    }

    /// Status messages published so far, as (channel, status).
    pub fn statuses(&mut self) -> Vec<(String, NodeStatus)> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let ExecutionEvent::Status(message) = event {
                seen.push((message.channel, message.data.status));
            }
        }
        seen
    }

    pub fn status_sequence(&mut self) -> Vec<NodeStatus> {
        self.statuses().into_iter().map(|(_, status)| status).collect()
    }
}

pub fn empty() -> Value {
    json!({})
}
