use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use wirecore::{Connection, NodeSpec, WorkflowError};

/// Linearise a workflow graph.
///
/// Every connection `a -> b` places `a` before `b`. Nodes that take part
/// in at least one connection come first, in dependency order; nodes with
/// no connections follow in storage order. Without any connections the
/// storage order is returned unchanged.
///
/// Self-loops carry no ordering and are ignored; duplicate connections
/// collapse into one edge.
pub fn topological_sort<'a>(
    nodes: &'a [NodeSpec],
    connections: &[Connection],
) -> Result<Vec<&'a NodeSpec>, WorkflowError> {
    let position: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    let lookup = |id: &str| {
        position
            .get(id)
            .copied()
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))
    };

    let mut edges = Vec::with_capacity(connections.len());
    for connection in connections {
        let from = lookup(&connection.from_node_id)?;
        let to = lookup(&connection.to_node_id)?;
        if from != to {
            edges.push((from, to));
        }
    }

    if edges.is_empty() {
        return Ok(nodes.iter().collect());
    }

    let mut connected = vec![false; nodes.len()];
    for &(from, to) in &edges {
        connected[from] = true;
        connected[to] = true;
    }

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut index: HashMap<usize, NodeIndex> = HashMap::new();
    for (i, _) in connected.iter().enumerate().filter(|(_, c)| **c) {
        index.insert(i, graph.add_node(i));
    }
    for (from, to) in edges {
        graph.update_edge(index[&from], index[&to], ());
    }

    let sorted = toposort(&graph, None).map_err(|cycle| {
        tracing::debug!("Cycle detected at node {}", nodes[graph[cycle.node_id()]].id);
        WorkflowError::CyclicDependency
    })?;

    let mut ordered: Vec<&NodeSpec> = sorted.into_iter().map(|ix| &nodes[graph[ix]]).collect();
    ordered.extend(
        nodes
            .iter()
            .zip(connected)
            .filter(|(_, c)| !c)
            .map(|(node, _)| node),
    );

    Ok(ordered)
}
