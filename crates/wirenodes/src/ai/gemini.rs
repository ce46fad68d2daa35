//! Google Generative Language API

use super::{ContentPart, Generation, TextPrompt};
use crate::transport::{HttpMethod, OutboundRequest};
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub fn build_request(base_url: &str, api_key: &str, prompt: &TextPrompt) -> OutboundRequest {
    OutboundRequest::new(
        HttpMethod::Post,
        format!("{}/v1beta/models/{}:generateContent", base_url, prompt.model),
    )
    .header("x-goog-api-key", api_key)
    .json(&json!({
        "systemInstruction": { "parts": [ { "text": prompt.system } ] },
        "contents": [ { "role": "user", "parts": [ { "text": prompt.prompt } ] } ],
    }))
}

pub fn parse_response(body: &Value) -> Result<Generation, String> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| "response has no candidates".to_string())?;

    let content = parts
        .iter()
        .map(|part| match part.get("text") {
            Some(Value::String(text)) => ContentPart::Text { text: text.clone() },
            _ => ContentPart::Other,
        })
        .collect();

    Ok(Generation::from_parts(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_is_part_of_the_path() {
        let request = build_request(
            BASE_URL,
            "g-key",
            &TextPrompt {
                model: "gemini-2.0-flash".into(),
                system: "s".into(),
                prompt: "p".into(),
            },
        );
        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(request.header_value("x-goog-api-key"), Some("g-key"));
    }

    #[test]
    fn parses_candidate_parts() {
        let generation = parse_response(&json!({
            "candidates": [ { "content": { "role": "model", "parts": [ { "text": "Bonjour" } ] } } ]
        }))
        .unwrap();
        assert_eq!(generation.first_text(), "Bonjour");
        assert!(parse_response(&json!({ "promptFeedback": {} })).is_err());
    }
}
