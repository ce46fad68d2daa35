mod common;

use common::{empty, Harness, RecordingClient};
use serde_json::{json, Value};
use wirecore::{NodeError, NodeExecutor, NodeStatus, NodeType};
use wirenodes::transport::{HttpMethod, TransportError};
use wirenodes::HttpRequestExecutor;

#[tokio::test]
async fn get_renders_the_endpoint_and_sends_no_body() {
    let client = RecordingClient::new();
    client.respond_json(200, json!({ "login": "octocat" }));
    let executor = HttpRequestExecutor::new(client.clone());
    let mut harness = Harness::new();

    let ctx = harness.context(
        "evt-1",
        NodeType::HttpRequest,
        json!({
            "endpoint": "https://api.example.com/users/{{form.user}}",
            "method": "GET",
            "body": "{ \"ignored\": true }",
            "variableName": "profile"
        }),
        json!({ "form": { "user": "octocat" } }),
    );

    let output = executor.execute(ctx).await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[0].url, "https://api.example.com/users/octocat");
    assert_eq!(requests[0].body, None);

    assert_eq!(
        output.get("profile"),
        Some(&json!({
            "httpResponse": { "status": 200, "statusText": "OK", "data": { "login": "octocat" } }
        }))
    );
    // Earlier entries are kept
    assert_eq!(output.get("form"), Some(&json!({ "user": "octocat" })));
    assert_eq!(harness.status_sequence(), vec![NodeStatus::Loading, NodeStatus::Success]);
}

#[tokio::test]
async fn post_sends_rendered_json_body() {
    let client = RecordingClient::new();
    client.respond_text(200, "created");
    let executor = HttpRequestExecutor::new(client.clone());
    let harness = Harness::new();

    let ctx = harness.context(
        "evt-2",
        NodeType::HttpRequest,
        json!({
            "endpoint": "https://hooks.example.com/in",
            "method": "POST",
            "body": "{ \"items\": {{json order.items}}, \"note\": \"{{order.note}}\" }",
            "variableName": "hook"
        }),
        json!({ "order": { "items": [1, 2], "note": "a & b" } }),
    );

    let output = executor.execute(ctx).await.unwrap();

    let request = &client.requests()[0];
    assert_eq!(request.header_value("content-type"), Some("application/json"));
    let sent: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(sent, json!({ "items": [1, 2], "note": "a & b" }));

    // Non-JSON responses are kept as text
    assert_eq!(output.get("hook").unwrap()["httpResponse"]["data"], json!("created"));
}

#[tokio::test]
async fn invalid_json_body_fails_before_the_request() {
    let client = RecordingClient::new();
    let executor = HttpRequestExecutor::new(client.clone());
    let mut harness = Harness::new();

    let ctx = harness.context(
        "evt-3",
        NodeType::HttpRequest,
        json!({
            "endpoint": "https://example.com",
            "method": "PUT",
            "body": "{ \"name\": {{user.name}} }",
            "variableName": "result"
        }),
        json!({ "user": { "name": "not quoted" } }),
    );

    let err = executor.execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::InvalidBody { .. }));
    assert!(!err.is_retriable());
    assert!(client.requests().is_empty());
    assert_eq!(harness.status_sequence(), vec![NodeStatus::Loading, NodeStatus::Error]);
}

#[tokio::test]
async fn missing_endpoint_is_a_permanent_error() {
    let client = RecordingClient::new();
    let executor = HttpRequestExecutor::new(client.clone());
    let mut harness = Harness::new();

    let ctx = harness.context("evt-4", NodeType::HttpRequest, json!({ "variableName": "x" }), empty());

    let err = executor.execute(ctx).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP Request node: endpoint is not configured");
    assert!(!err.is_retriable());
    assert!(client.requests().is_empty());
    assert_eq!(harness.status_sequence(), vec![NodeStatus::Loading, NodeStatus::Error]);
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let client = RecordingClient::new();
    let executor = HttpRequestExecutor::new(client.clone());
    let harness = Harness::new();

    let ctx = harness.context(
        "evt-5",
        NodeType::HttpRequest,
        json!({ "endpoint": "https://example.com", "method": "TRACE", "variableName": "x" }),
        empty(),
    );

    let err = executor.execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::Configuration { .. }));
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn server_errors_are_retriable_and_replays_skip_the_call() {
    let client = RecordingClient::new();
    client.respond_text(500, "oops");
    client.respond_json(200, json!({ "ok": true }));
    client.respond(Err(TransportError::Connection("must not be sent".into())));
    let executor = HttpRequestExecutor::new(client.clone());
    let harness = Harness::new();
    let data = json!({ "endpoint": "https://example.com", "variableName": "r" });

    let err = executor
        .execute(harness.context("evt-6", NodeType::HttpRequest, data.clone(), empty()))
        .await
        .unwrap_err();
    assert!(err.is_retriable());

    let first = executor
        .execute(harness.context("evt-6", NodeType::HttpRequest, data.clone(), empty()))
        .await
        .unwrap();
    // Same run again: the recorded response is reused
    let replay = executor
        .execute(harness.context("evt-6", NodeType::HttpRequest, data, empty()))
        .await
        .unwrap();

    assert_eq!(first, replay);
    assert_eq!(client.requests().len(), 2);
}
