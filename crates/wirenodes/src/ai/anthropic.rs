//! Anthropic Messages API

use super::{ContentPart, Generation, TextPrompt};
use crate::transport::{HttpMethod, OutboundRequest};
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub fn build_request(base_url: &str, api_key: &str, prompt: &TextPrompt) -> OutboundRequest {
    OutboundRequest::new(HttpMethod::Post, format!("{}/v1/messages", base_url))
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .json(&json!({
            "model": prompt.model,
            "max_tokens": MAX_TOKENS,
            "system": prompt.system,
            "messages": [ { "role": "user", "content": prompt.prompt } ],
        }))
}

pub fn parse_response(body: &Value) -> Result<Generation, String> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| "response has no content".to_string())?;

    let content = blocks
        .iter()
        .map(|block| match (block.get("type").and_then(Value::as_str), block.get("text")) {
            (Some("text"), Some(Value::String(text))) => ContentPart::Text { text: text.clone() },
            _ => ContentPart::Other,
        })
        .collect();

    Ok(Generation::from_parts(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape() {
        let request = build_request(
            BASE_URL,
            "sk-ant",
            &TextPrompt {
                model: "claude-sonnet-4-0".into(),
                system: "be brief".into(),
                prompt: "hi".into(),
            },
        );

        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(request.header_value("x-api-key"), Some("sk-ant"));
        assert_eq!(request.header_value("anthropic-version"), Some(API_VERSION));

        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["system"], json!("be brief"));
        assert_eq!(body["messages"][0]["content"], json!("hi"));
    }

    #[test]
    fn parses_text_blocks() {
        let generation = parse_response(&json!({
            "content": [ { "type": "text", "text": "Hello" } ],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(generation.first_text(), "Hello");
        assert!(parse_response(&json!({ "error": {} })).is_err());
    }
}
