mod common;

use common::{empty, Harness, RecordingClient};
use serde_json::{json, Value};
use wirecore::{NodeExecutor, NodeStatus, NodeType};
use wirenodes::{WebhookExecutor, DISCORD_CONTENT_LIMIT};

#[tokio::test]
async fn discord_decodes_and_truncates_content() {
    let client = RecordingClient::new();
    let executor = WebhookExecutor::discord(client.clone());
    let mut harness = Harness::new();

    let long = "x".repeat(2500);
    let ctx = harness.context(
        "evt-d1",
        NodeType::Discord,
        json!({
            "variableName": "discord",
            "webhookUrl": "https://discord.com/api/webhooks/1/abc",
            "content": "Tom &amp; Jerry: {{body}}",
            "username": "{{bot}} &lt;bot&gt;"
        }),
        json!({ "body": long, "bot": "Wire" }),
    );
    let output = executor.execute(ctx).await.unwrap();

    let request = &client.requests()[0];
    assert_eq!(request.url, "https://discord.com/api/webhooks/1/abc");
    let sent: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
    let content = sent["content"].as_str().unwrap();
    assert!(content.starts_with("Tom & Jerry: xxx"));
    assert_eq!(content.chars().count(), DISCORD_CONTENT_LIMIT);
    assert_eq!(sent["username"], json!("Wire <bot>"));

    let result = output.get("discord").unwrap();
    assert_eq!(result["messageSent"], json!(true));
    assert_eq!(result["messageContent"], json!(content));
    assert_eq!(harness.status_sequence(), vec![NodeStatus::Loading, NodeStatus::Success]);
}

#[tokio::test]
async fn slack_sends_full_content_without_username() {
    let client = RecordingClient::new();
    let executor = WebhookExecutor::slack(client.clone());
    let mut harness = Harness::new();

    let long = "y".repeat(2500);
    let ctx = harness.context(
        "evt-s1",
        NodeType::Slack,
        json!({
            "variableName": "slack",
            "webhookUrl": "https://hooks.slack.com/services/T/B/C",
            "content": "{{message}}",
            "username": "ignored"
        }),
        json!({ "message": long }),
    );
    executor.execute(ctx).await.unwrap();

    let sent: Value = serde_json::from_str(client.requests()[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(sent, json!({ "content": long }));
    assert_eq!(
        harness.statuses()[0],
        ("slack-execution".to_string(), NodeStatus::Loading)
    );
}

#[tokio::test]
async fn missing_webhook_url_is_permanent() {
    let client = RecordingClient::new();
    let executor = WebhookExecutor::slack(client.clone());
    let mut harness = Harness::new();

    let ctx = harness.context(
        "evt-s2",
        NodeType::Slack,
        json!({ "variableName": "slack", "content": "hi" }),
        empty(),
    );
    let err = executor.execute(ctx).await.unwrap_err();

    assert_eq!(err.to_string(), "Slack node: webhookUrl is not configured");
    assert!(!err.is_retriable());
    assert!(client.requests().is_empty());
    assert_eq!(harness.status_sequence(), vec![NodeStatus::Loading, NodeStatus::Error]);
}

#[tokio::test]
async fn rejected_webhook_is_retriable() {
    let client = RecordingClient::new();
    client.respond_text(401, "invalid token");
    let executor = WebhookExecutor::discord(client.clone());
    let harness = Harness::new();

    let ctx = harness.context(
        "evt-d2",
        NodeType::Discord,
        json!({ "variableName": "d", "webhookUrl": "https://discord.test/x", "content": "hi" }),
        empty(),
    );
    let err = executor.execute(ctx).await.unwrap_err();
    assert!(err.is_retriable());
    assert!(err.to_string().contains("401"));
}
