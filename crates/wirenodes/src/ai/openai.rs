//! OpenAI Chat Completions API

use super::{ContentPart, Generation, TextPrompt};
use crate::transport::{HttpMethod, OutboundRequest};
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://api.openai.com";

pub fn build_request(base_url: &str, api_key: &str, prompt: &TextPrompt) -> OutboundRequest {
    OutboundRequest::new(HttpMethod::Post, format!("{}/v1/chat/completions", base_url))
        .header("Authorization", format!("Bearer {}", api_key))
        .json(&json!({
            "model": prompt.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.prompt },
            ],
        }))
}

pub fn parse_response(body: &Value) -> Result<Generation, String> {
    let message = body
        .pointer("/choices/0/message")
        .ok_or_else(|| "response has no choices".to_string())?;

    let content = match message.get("content") {
        Some(Value::String(text)) => vec![ContentPart::Text { text: text.clone() }],
        // Refusals and tool calls come without text content
        _ => vec![ContentPart::Other],
    };

    Ok(Generation::from_parts(content))
}
