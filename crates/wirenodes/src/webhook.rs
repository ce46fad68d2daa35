use crate::http::request_failed;
use crate::transport::{HttpClient, HttpMethod, OutboundRequest, OutboundResponse};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use wirecore::{ExecutionContext, ExecutorMetadata, NodeContext, NodeError, NodeExecutor, NodeType};

/// Discord rejects longer message content
pub const DISCORD_CONTENT_LIMIT: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatService {
    Discord,
    Slack,
}

impl ChatService {
    fn node_type(&self) -> NodeType {
        match self {
            ChatService::Discord => NodeType::Discord,
            ChatService::Slack => NodeType::Slack,
        }
    }

    fn step_name(&self) -> &'static str {
        match self {
            ChatService::Discord => "discord-webhook",
            ChatService::Slack => "slack-webhook",
        }
    }
}

/// Posts a message to a Discord or Slack incoming webhook.
///
/// Config: `variableName`, `content` and `webhookUrl` (required);
/// Discord also takes an optional `username`. Rendered text is
/// HTML-entity decoded before sending. The result is stored as
/// `{ messageSent: true, messageContent }`.
pub struct WebhookExecutor {
    service: ChatService,
    client: Arc<dyn HttpClient>,
}

impl WebhookExecutor {
    pub fn new(service: ChatService, client: Arc<dyn HttpClient>) -> Self {
        Self { service, client }
    }

    pub fn discord(client: Arc<dyn HttpClient>) -> Self {
        Self::new(ChatService::Discord, client)
    }

    pub fn slack(client: Arc<dyn HttpClient>) -> Self {
        Self::new(ChatService::Slack, client)
    }
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

fn truncate_chars(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

#[async_trait]
impl NodeExecutor for WebhookExecutor {
    fn node_type(&self) -> NodeType {
        self.service.node_type()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        let node = ctx.node_type.display_name();
        ctx.status.loading();

        let variable_name = ctx.require_config("variableName")?.to_string();
        let content = ctx.require_config("content")?;
        let webhook_url = ctx.require_config("webhookUrl")?.to_string();

        let mut content = decode(&ctx.render(content)?);
        let mut payload = Map::new();

        if self.service == ChatService::Discord {
            content = truncate_chars(content, DISCORD_CONTENT_LIMIT);
            if let Some(username) = ctx.render_optional("username")? {
                payload.insert("username".to_string(), Value::String(decode(&username)));
            }
        }
        payload.insert("content".to_string(), Value::String(content.clone()));

        let request = OutboundRequest::new(HttpMethod::Post, webhook_url).json(&Value::Object(payload));
        let client = self.client.clone();

        ctx.step
            .run(self.service.step_name(), || async move {
                client
                    .send(request)
                    .await
                    .and_then(OutboundResponse::error_for_status)
                    .map_err(|e| request_failed(node, e))?;
                Ok(true)
            })
            .await
            .map_err(|e| ctx.fail(e))?;

        ctx.status.success();
        Ok(ctx.context.with(
            variable_name,
            json!({ "messageSent": true, "messageContent": content }),
        ))
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: match self.service {
                ChatService::Discord => "Send a message to a Discord channel webhook",
                ChatService::Slack => "Send a message to a Slack incoming webhook",
            },
            category: "messaging",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities_are_decoded() {
        assert_eq!(decode("Tom &amp; Jerry &lt;3 &#39;hi&#39;"), "Tom & Jerry <3 'hi'");
    }

    #[test]
    fn truncation_counts_characters() {
        let text = "é".repeat(2001);
        let cut = truncate_chars(text, DISCORD_CONTENT_LIMIT);
        assert_eq!(cut.chars().count(), 2000);
        assert_eq!(truncate_chars("short".into(), 10), "short");
    }
}
