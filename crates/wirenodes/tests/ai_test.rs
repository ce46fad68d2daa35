mod common;

use common::{empty, Harness, RecordingClient, OWNER};
use serde_json::{json, Value};
use wirecore::{CredentialType, NodeError, NodeExecutor, NodeStatus, NodeType};
use wirenodes::ai::DEFAULT_SYSTEM_PROMPT;
use wirenodes::{AiExecutor, Provider};

fn anthropic_reply(text: &str) -> Value {
    json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "content": [ { "type": "text", "text": text } ]
    })
}

fn config(credential_id: &str) -> Value {
    json!({
        "model": "claude-3-5-haiku-latest",
        "variableName": "summary",
        "userPrompt": "Summarise: {{form.text}}",
        "credentialId": credential_id
    })
}

#[tokio::test]
async fn generates_text_with_the_owners_credential() {
    let client = RecordingClient::new();
    client.respond_json(200, anthropic_reply("Short version"));
    let executor = AiExecutor::new(Provider::Anthropic, client.clone()).with_base_url("http://llm.test/");
    let mut harness = Harness::new()
        .with_credential("cred-1", OWNER, CredentialType::Anthropic)
        .await;

    let ctx = harness.context(
        "evt-ai-1",
        NodeType::Anthropic,
        config("cred-1"),
        json!({ "form": { "text": "a long story" } }),
    );
    let output = executor.execute(ctx).await.unwrap();

    assert_eq!(output.get("summary"), Some(&json!({ "aiResponse": "Short version" })));

    let request = &client.requests()[0];
    assert_eq!(request.url, "http://llm.test/v1/messages");
    assert_eq!(request.header_value("x-api-key"), Some("secret-cred-1"));
    let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["system"], json!(DEFAULT_SYSTEM_PROMPT));
    assert_eq!(body["messages"][0]["content"], json!("Summarise: a long story"));

    assert_eq!(
        harness.statuses(),
        vec![
            ("anthropic-execution".to_string(), NodeStatus::Loading),
            ("anthropic-execution".to_string(), NodeStatus::Success),
        ]
    );
}

#[tokio::test]
async fn credential_of_another_user_is_not_found() {
    let client = RecordingClient::new();
    let executor = AiExecutor::new(Provider::OpenAi, client.clone());
    let mut harness = Harness::new()
        .with_credential("cred-2", "someone-else", CredentialType::OpenAi)
        .await;

    let ctx = harness.context("evt-ai-2", NodeType::OpenAi, config("cred-2"), empty());
    let err = executor.execute(ctx).await.unwrap_err();

    assert_eq!(err, NodeError::CredentialNotFound { node: "OpenAI" });
    assert!(!err.is_retriable());
    assert!(client.requests().is_empty());
    assert_eq!(harness.status_sequence(), vec![NodeStatus::Loading, NodeStatus::Error]);
}

#[tokio::test]
async fn credential_for_another_provider_is_not_found() {
    let client = RecordingClient::new();
    let executor = AiExecutor::new(Provider::Gemini, client.clone());
    let harness = Harness::new()
        .with_credential("cred-3", OWNER, CredentialType::Anthropic)
        .await;

    let ctx = harness.context("evt-ai-3", NodeType::Gemini, config("cred-3"), empty());
    let err = executor.execute(ctx).await.unwrap_err();

    assert_eq!(err, NodeError::CredentialNotFound { node: "Gemini" });
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn missing_user_prompt_is_reported_before_anything_else() {
    let client = RecordingClient::new();
    let executor = AiExecutor::new(Provider::Anthropic, client.clone());
    let mut harness = Harness::new();

    let ctx = harness.context(
        "evt-ai-4",
        NodeType::Anthropic,
        json!({ "model": "claude", "variableName": "out", "userPrompt": "  ", "credentialId": "c" }),
        empty(),
    );
    let err = executor.execute(ctx).await.unwrap_err();

    assert_eq!(err.to_string(), "Anthropic node: userPrompt is not configured");
    assert!(!err.is_retriable());
    assert_eq!(harness.status_sequence(), vec![NodeStatus::Loading, NodeStatus::Error]);
}

#[tokio::test]
async fn provider_outage_is_retriable() {
    let client = RecordingClient::new();
    client.respond_json(500, json!({ "error": { "message": "overloaded" } }));
    let executor = AiExecutor::new(Provider::Anthropic, client.clone());
    let harness = Harness::new()
        .with_credential("cred-5", OWNER, CredentialType::Anthropic)
        .await;

    let ctx = harness.context("evt-ai-5", NodeType::Anthropic, config("cred-5"), empty());
    let err = executor.execute(ctx).await.unwrap_err();

    assert!(matches!(err, NodeError::Request { node: "Anthropic", .. }));
    assert!(err.is_retriable());
}

#[tokio::test]
async fn openai_and_gemini_use_their_own_wire_format() {
    let client = RecordingClient::new();
    client.respond_json(200, json!({ "choices": [ { "message": { "content": "from gpt" } } ] }));
    client.respond_json(
        200,
        json!({ "candidates": [ { "content": { "parts": [ { "text": "from gemini" } ] } } ] }),
    );
    let harness = Harness::new()
        .with_credential("oa", OWNER, CredentialType::OpenAi)
        .await
        .with_credential("gm", OWNER, CredentialType::Gemini)
        .await;

    let mut openai_config = config("oa");
    openai_config["systemPrompt"] = json!("You answer in {{lang}}");
    let openai = AiExecutor::new(Provider::OpenAi, client.clone())
        .execute(harness.context("evt-ai-6", NodeType::OpenAi, openai_config, json!({ "lang": "French" })))
        .await
        .unwrap();
    let gemini = AiExecutor::new(Provider::Gemini, client.clone())
        .execute(harness.context("evt-ai-6b", NodeType::Gemini, config("gm"), empty()))
        .await
        .unwrap();

    assert_eq!(openai.get("summary").unwrap()["aiResponse"], json!("from gpt"));
    assert_eq!(gemini.get("summary").unwrap()["aiResponse"], json!("from gemini"));

    let requests = client.requests();
    assert_eq!(requests[0].header_value("authorization"), Some("Bearer secret-oa"));
    let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(body["messages"][0]["content"], json!("You answer in French"));
    assert!(requests[1].url.ends_with("/v1beta/models/claude-3-5-haiku-latest:generateContent"));
}
