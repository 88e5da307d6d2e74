//! DAG validation and plan construction — run once per run, at start time.
//!
//! Rules enforced:
//! 1. Node IDs must be unique within the workflow.
//! 2. Every edge must reference valid node IDs (both `from` and `to`).
//! 3. The directed graph must be acyclic (topological sort must succeed).
//!
//! Returns a [`Plan`]: topological order plus `deps`/`dependents` adjacency,
//! denormalized onto the Run by the orchestrator (§9 persisted-plan flag)
//! so the Coordinator never re-derives topology from the live Workflow.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::{Plan, Workflow};
use crate::EngineError;

/// Validate the workflow's DAG and build its execution plan.
///
/// # Errors
/// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
/// - [`EngineError::UnknownNodeReference`] if an edge references a missing node.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn build_plan(workflow: &Workflow) -> Result<Plan, EngineError> {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in &workflow.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    let node_set: HashSet<&str> = workflow.nodes.iter().map(|n| n.id.as_str()).collect();

    for edge in &workflow.edges {
        if !node_set.contains(edge.from.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.from.clone(),
                side: "from",
            });
        }
        if !node_set.contains(edge.to.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.to.clone(),
                side: "to",
            });
        }
    }

    let mut deps: HashMap<String, Vec<String>> = HashMap::new();
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for node in &workflow.nodes {
        deps.entry(node.id.clone()).or_default();
        dependents.entry(node.id.clone()).or_default();
        in_degree.entry(node.id.as_str()).or_insert(0);
        adjacency.entry(node.id.as_str()).or_default();
    }

    for edge in &workflow.edges {
        adjacency.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
        *in_degree.entry(edge.to.as_str()).or_insert(0) += 1;
        deps.entry(edge.to.clone()).or_default().push(edge.from.clone());
        dependents.entry(edge.from.clone()).or_default().push(edge.to.clone());
    }

    // Kahn's algorithm, seeded with nodes that have no incoming edges. Sort
    // the initial queue and each batch of newly-freed nodes so the order is
    // deterministic across runs (not load-bearing for correctness, but
    // makes plans reproducible for logging/debugging).
    let mut queue: VecDeque<&str> = {
        let mut v: Vec<&str> = in_degree.iter().filter(|(_, &d)| d == 0).map(|(&id, _)| id).collect();
        v.sort_unstable();
        v.into()
    };

    let mut order: Vec<String> = Vec::with_capacity(workflow.nodes.len());

    while let Some(node_id) = queue.pop_front() {
        order.push(node_id.to_owned());

        let mut freed: Vec<&str> = Vec::new();
        if let Some(neighbours) = adjacency.get(node_id) {
            for &neighbour in neighbours {
                let deg = in_degree.entry(neighbour).or_insert(0);
                *deg -= 1;
                if *deg == 0 {
                    freed.push(neighbour);
                }
            }
        }
        freed.sort_unstable();
        for n in freed {
            queue.push_back(n);
        }
    }

    if order.len() != workflow.nodes.len() {
        return Err(EngineError::CycleDetected);
    }

    for preds in deps.values_mut() {
        preds.sort();
    }
    for succs in dependents.values_mut() {
        succs.sort();
    }

    Ok(Plan { order, deps, dependents })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Edge, NodeDefinition, Trigger};

    fn make_node(id: &str) -> NodeDefinition {
        NodeDefinition {
            id: id.to_string(),
            node_type: "text.transform".into(),
            config: serde_json::Value::Null,
        }
    }

    fn make_workflow(nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Workflow {
        Workflow::new("test", "owner-1", Trigger::Manual, nodes, edges)
    }

    #[test]
    fn valid_linear_dag_returns_sorted_order() {
        let workflow = make_workflow(
            vec![make_node("a"), make_node("b"), make_node("c")],
            vec![
                Edge { from: "a".into(), to: "b".into() },
                Edge { from: "b".into(), to: "c".into() },
            ],
        );

        let plan = build_plan(&workflow).expect("should be valid");
        assert_eq!(plan.order, vec!["a", "b", "c"]);
        assert_eq!(plan.deps["b"], vec!["a"]);
        assert_eq!(plan.dependents["a"], vec!["b"]);
    }

    #[test]
    fn valid_diamond_dag() {
        //   A
        //  / \
        // B   C
        //  \ /
        //   D
        let workflow = make_workflow(
            vec![make_node("a"), make_node("b"), make_node("c"), make_node("d")],
            vec![
                Edge { from: "a".into(), to: "b".into() },
                Edge { from: "a".into(), to: "c".into() },
                Edge { from: "b".into(), to: "d".into() },
                Edge { from: "c".into(), to: "d".into() },
            ],
        );

        let plan = build_plan(&workflow).expect("should be valid");
        assert_eq!(plan.order.first().unwrap(), "a");
        assert_eq!(plan.order.last().unwrap(), "d");
        assert_eq!(plan.order.len(), 4);
        assert_eq!(plan.deps["d"], vec!["b", "c"]);
        assert_eq!(plan.frontier(), vec!["a".to_string()]);
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let workflow = make_workflow(vec![make_node("a"), make_node("a")], vec![]);
        assert!(matches!(
            build_plan(&workflow),
            Err(EngineError::DuplicateNodeId(id)) if id == "a"
        ));
    }

    #[test]
    fn edge_referencing_missing_node_is_rejected() {
        let workflow = make_workflow(
            vec![make_node("a")],
            vec![Edge { from: "a".into(), to: "ghost".into() }],
        );
        assert!(matches!(
            build_plan(&workflow),
            Err(EngineError::UnknownNodeReference { node_id, .. }) if node_id == "ghost"
        ));
    }

    #[test]
    fn cycle_is_detected() {
        let workflow = make_workflow(
            vec![make_node("a"), make_node("b"), make_node("c")],
            vec![
                Edge { from: "a".into(), to: "b".into() },
                Edge { from: "b".into(), to: "c".into() },
                Edge { from: "c".into(), to: "a".into() },
            ],
        );
        assert!(matches!(build_plan(&workflow), Err(EngineError::CycleDetected)));
    }

    #[test]
    fn single_node_no_edges_is_valid() {
        let workflow = make_workflow(vec![make_node("solo")], vec![]);
        let plan = build_plan(&workflow).expect("single node should be valid");
        assert_eq!(plan.order, vec!["solo"]);
        assert_eq!(plan.frontier(), vec!["solo".to_string()]);
    }

    #[test]
    fn empty_workflow_has_empty_plan() {
        let workflow = make_workflow(vec![], vec![]);
        let plan = build_plan(&workflow).expect("empty workflow is valid");
        assert!(plan.order.is_empty());
        assert!(plan.frontier().is_empty());
    }
}
