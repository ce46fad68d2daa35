//! Standard executor library
//!
//! Executors for every built-in node type plus the outbound HTTP
//! transport they share.

pub mod ai;
mod http;
pub mod transport;
mod trigger;
mod webhook;

pub use ai::{AiExecutor, Provider};
pub use http::HttpRequestExecutor;
pub use transport::{HttpClient, ReqwestClient};
pub use trigger::{InitialExecutor, TriggerExecutor};
pub use webhook::{ChatService, WebhookExecutor, DISCORD_CONTENT_LIMIT};
use wireruntime::ExecutorRegistry;

use std::sync::Arc;

/// Register all standard executors with a registry
pub fn register_all(registry: &mut ExecutorRegistry, client: Arc<dyn HttpClient>) {
    registry.register(Arc::new(InitialExecutor));
    registry.register(Arc::new(TriggerExecutor::manual()));
    registry.register(Arc::new(TriggerExecutor::google_form()));
    registry.register(Arc::new(TriggerExecutor::stripe()));
    registry.register(Arc::new(HttpRequestExecutor::new(client.clone())));
    registry.register(Arc::new(AiExecutor::new(Provider::Anthropic, client.clone())));
    registry.register(Arc::new(AiExecutor::new(Provider::OpenAi, client.clone())));
    registry.register(Arc::new(AiExecutor::new(Provider::Gemini, client.clone())));
    registry.register(Arc::new(WebhookExecutor::discord(client.clone())));
    registry.register(Arc::new(WebhookExecutor::slack(client)));
}

/// Registry with every standard executor talking to the real network
pub fn default_registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    register_all(&mut registry, Arc::new(ReqwestClient::new()));
    registry
}
