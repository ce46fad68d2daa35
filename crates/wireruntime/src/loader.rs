use crate::graph::topological_sort;
use crate::registry::ExecutorRegistry;
use std::path::Path;
use wirecore::{NodeId, Workflow, WorkflowError};

/// Read a workflow definition from a JSON file.
pub async fn load_workflow(path: impl AsRef<Path>) -> Result<Workflow, WorkflowError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| WorkflowError::Invalid(format!("cannot read {}: {}", path.display(), e)))?;

    parse_workflow(&raw)
        .map_err(|e| WorkflowError::Invalid(format!("{}: {}", path.display(), e)))
}

pub fn parse_workflow(raw: &str) -> Result<Workflow, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Check that a workflow can run on `registry` and return its node order.
pub fn validate_workflow(
    workflow: &Workflow,
    registry: &ExecutorRegistry,
) -> Result<Vec<NodeId>, WorkflowError> {
    let mut seen = std::collections::HashSet::new();
    for node in &workflow.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(WorkflowError::Invalid(format!("duplicate node id {}", node.id)));
        }
        registry.resolve(node.node_type)?;
    }

    let manual_triggers = workflow
        .nodes
        .iter()
        .filter(|n| n.node_type == wirecore::NodeType::ManualTrigger)
        .count();
    if manual_triggers > 1 {
        return Err(WorkflowError::Invalid(
            "at most one MANUAL_TRIGGER node is allowed".to_string(),
        ));
    }

    let ordered = topological_sort(&workflow.nodes, &workflow.connections)?;
    Ok(ordered.into_iter().map(|n| n.id.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKFLOW: &str = r#"{
        "id": "wf-1",
        "name": "Ping",
        "owner": "user-1",
        "nodes": [
            { "id": "call", "type": "HTTP_REQUEST", "data": { "endpoint": "https://example.com" } },
            { "id": "start", "type": "MANUAL_TRIGGER", "position": { "x": 0, "y": 0 } }
        ],
        "connections": [ { "fromNodeId": "start", "toNodeId": "call" } ]
    }"#;

    #[test]
    fn parses_editor_json() {
        let workflow = parse_workflow(WORKFLOW).unwrap();
        assert_eq!(workflow.nodes.len(), 2);
        assert_eq!(workflow.connections[0].from_node_id, "start");
    }

    #[test]
    fn unknown_node_type_does_not_parse() {
        let raw = WORKFLOW.replace("HTTP_REQUEST", "FTP_UPLOAD");
        assert!(parse_workflow(&raw).is_err());
    }

    #[test]
    fn validation_needs_registered_executors() {
        let workflow = parse_workflow(WORKFLOW).unwrap();
        let err = validate_workflow(&workflow, &ExecutorRegistry::new()).unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownNodeType(_)));
    }
}
