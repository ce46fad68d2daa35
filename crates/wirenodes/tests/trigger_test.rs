mod common;

use common::Harness;
use serde_json::json;
use wirecore::{NodeExecutor, NodeStatus, NodeType};
use wirenodes::{InitialExecutor, TriggerExecutor};

#[tokio::test]
async fn triggers_pass_context_through() {
    for (executor, node_type, channel) in [
        (TriggerExecutor::manual(), NodeType::ManualTrigger, "manual-trigger-execution"),
        (TriggerExecutor::google_form(), NodeType::GoogleFormTrigger, "google-form-trigger-execution"),
        (TriggerExecutor::stripe(), NodeType::StripeTrigger, "stripe-trigger-execution"),
    ] {
        let mut harness = Harness::new();
        let seed = json!({ "stripe": { "amount": 100 } });
        let ctx = harness.context("evt-t", node_type, json!({}), seed.clone());

        let output = executor.execute(ctx).await.unwrap();

        assert_eq!(output.into_value(), seed);
        assert_eq!(
            harness.statuses(),
            vec![
                (channel.to_string(), NodeStatus::Loading),
                (channel.to_string(), NodeStatus::Success),
            ]
        );
    }
}

#[tokio::test]
async fn initial_node_is_silent() {
    let mut harness = Harness::new();
    let ctx = harness.context("evt-i", NodeType::Initial, json!({}), json!({ "a": 1 }));

    let output = InitialExecutor.execute(ctx).await.unwrap();

    assert_eq!(output.get("a"), Some(&json!(1)));
    assert!(harness.statuses().is_empty());
}
