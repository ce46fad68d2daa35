//! Text generation executors for the hosted model providers.

mod anthropic;
mod gemini;
mod openai;

use crate::http::request_failed;
use crate::transport::{HttpClient, OutboundRequest, OutboundResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use wirecore::{
    CredentialType, ExecutionContext, ExecutorMetadata, NodeContext, NodeError, NodeExecutor,
    NodeType,
};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn node_type(&self) -> NodeType {
        match self {
            Provider::Anthropic => NodeType::Anthropic,
            Provider::OpenAi => NodeType::OpenAi,
            Provider::Gemini => NodeType::Gemini,
        }
    }

    /// Credential type the provider accepts
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Provider::Anthropic => CredentialType::Anthropic,
            Provider::OpenAi => CredentialType::OpenAi,
            Provider::Gemini => CredentialType::Gemini,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Anthropic => anthropic::BASE_URL,
            Provider::OpenAi => openai::BASE_URL,
            Provider::Gemini => gemini::BASE_URL,
        }
    }

    fn step_name(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic-generate-text",
            Provider::OpenAi => "openai-generate-text",
            Provider::Gemini => "gemini-generate-text",
        }
    }

    fn node_name(&self) -> &'static str {
        self.node_type().display_name()
    }

    fn build_request(&self, base_url: &str, api_key: &str, prompt: &TextPrompt) -> OutboundRequest {
        match self {
            Provider::Anthropic => anthropic::build_request(base_url, api_key, prompt),
            Provider::OpenAi => openai::build_request(base_url, api_key, prompt),
            Provider::Gemini => gemini::build_request(base_url, api_key, prompt),
        }
    }

    fn parse_response(&self, body: &Value) -> Result<Generation, String> {
        match self {
            Provider::Anthropic => anthropic::parse_response(body),
            Provider::OpenAi => openai::parse_response(body),
            Provider::Gemini => gemini::parse_response(body),
        }
    }
}

/// A single-turn text generation call
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrompt {
    pub model: String,
    pub system: String,
    pub prompt: String,
}

/// Provider-neutral generation result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Generation {
    pub steps: Vec<GenerationStep>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationStep {
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl Generation {
    pub fn from_parts(content: Vec<ContentPart>) -> Self {
        Self {
            steps: vec![GenerationStep { content }],
        }
    }

    /// Text of the first content block of the first step, or empty when
    /// that block is not text.
    pub fn first_text(&self) -> String {
        match self.steps.first().and_then(|step| step.content.first()) {
            Some(ContentPart::Text { text }) => text.clone(),
            _ => String::new(),
        }
    }
}

/// Generates text with one provider.
///
/// Config: `model`, `variableName`, `userPrompt` and `credentialId`
/// (required), `systemPrompt` (optional). The credential must belong to
/// the workflow owner and match the provider. The result is stored as
/// `{ aiResponse: "..." }`.
pub struct AiExecutor {
    provider: Provider,
    client: Arc<dyn HttpClient>,
    base_url: String,
}

impl AiExecutor {
    pub fn new(provider: Provider, client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: provider.default_base_url().to_string(),
            provider,
            client,
        }
    }

    /// Point the executor at a different API host (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }
}

#[async_trait]
impl NodeExecutor for AiExecutor {
    fn node_type(&self) -> NodeType {
        self.provider.node_type()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        let node = self.provider.node_name();
        ctx.status.loading();

        let model = ctx.require_config("model")?.to_string();
        let variable_name = ctx.require_config("variableName")?.to_string();
        let user_prompt = ctx.require_config("userPrompt")?;
        let credential_id = ctx.require_config("credentialId")?;

        let system = ctx
            .render_optional("systemPrompt")?
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let prompt = ctx.render(user_prompt)?;

        // Looked up on every attempt so the secret never lands in the step log
        let credential = ctx
            .credentials
            .get_credential(credential_id, &ctx.user_id)
            .await
            .map_err(|e| {
                ctx.fail(NodeError::CredentialLookup {
                    node,
                    message: e.to_string(),
                })
            })?
            .filter(|c| c.credential_type == self.provider.credential_type())
            .ok_or_else(|| ctx.fail(NodeError::CredentialNotFound { node }))?;

        let request = self.provider.build_request(
            &self.base_url,
            &credential.secret,
            &TextPrompt {
                model,
                system,
                prompt,
            },
        );

        let provider = self.provider;
        let client = self.client.clone();
        let generation: Generation = ctx
            .step
            .run(provider.step_name(), || async move {
                let response = client
                    .send(request)
                    .await
                    .and_then(OutboundResponse::error_for_status)
                    .map_err(|e| request_failed(node, e))?;

                let body = response.json().map_err(|e| request_failed(node, e))?;
                provider
                    .parse_response(&body)
                    .map_err(|message| NodeError::Provider { node, message })
            })
            .await
            .map_err(|e| ctx.fail(e))?;

        tracing::debug!("{} generated {} step(s)", node, generation.steps.len());

        ctx.status.success();
        Ok(ctx
            .context
            .with(variable_name, json!({ "aiResponse": generation.first_text() })))
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: match self.provider {
                Provider::Anthropic => "Generate text with Claude",
                Provider::OpenAi => "Generate text with OpenAI chat models",
                Provider::Gemini => "Generate text with Google Gemini",
            },
            category: "ai",
        }
    }
}
