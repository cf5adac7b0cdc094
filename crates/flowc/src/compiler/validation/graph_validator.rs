//! # Eager Graph Validator
//!
//! Traversal validates lazily, on first dereference; this pass instead checks
//! the whole graph up front and returns every integrity violation at once.
//! Useful for editors that want the full problem list before compiling.

use crate::graph::{FlowGraph, Node, NodeKind};

use crate::CompileIssue;

/// Checks every id reference, the start-node invariant, and per-node parse
/// state. Returns an empty list for a structurally sound graph.
pub fn validate_graph(graph: &FlowGraph) -> Vec<CompileIssue> {
    let mut issues = Vec::new();

    let starts = graph.start_count();
    if starts != 1 {
        issues.push(CompileIssue::GraphIntegrity {
            detail: format!("graph must contain exactly one start node, found {starts}"),
        });
    }

    for node in graph.nodes() {
        for (link, target) in references(node) {
            if graph.find_node(target).is_none() {
                issues.push(CompileIssue::GraphIntegrity {
                    detail: format!(
                        "node `{}` references missing node `{target}` via `{link}`",
                        node.id
                    ),
                });
            }
        }

        match &node.kind {
            NodeKind::Unsupported { shape } => issues.push(CompileIssue::UnsupportedNodeKind {
                node_id: node.id.clone(),
                shape: shape.clone(),
            }),
            NodeKind::Invalid { shape, detail } => {
                issues.push(CompileIssue::InvalidNodeProperties {
                    node_id: node.id.clone(),
                    shape: shape.clone(),
                    detail: detail.clone(),
                })
            }
            _ => {}
        }
    }

    issues
}

/// Every outgoing id reference of a node, labelled by the link that holds it.
fn references(node: &Node) -> Vec<(&'static str, &str)> {
    let mut refs = Vec::new();
    if let Some(next) = node.next.as_deref() {
        refs.push(("next", next));
    }
    match &node.kind {
        NodeKind::If(props) => {
            if let Some(id) = props.true_branch.as_deref() {
                refs.push(("trueBranch", id));
            }
            if let Some(id) = props.false_branch.as_deref() {
                refs.push(("falseBranch", id));
            }
        }
        NodeKind::Switch(props) => {
            for case in &props.cases {
                if let Some(id) = case.next.as_deref() {
                    refs.push(("cases.next", id));
                }
            }
        }
        NodeKind::Loop(props) => {
            if let Some(id) = props.body_start.as_deref() {
                refs.push(("bodyStart", id));
            }
            for id in &props.body {
                refs.push(("body", id));
            }
        }
        _ => {}
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphDocument;
    use serde_json::json;

    fn graph(doc: serde_json::Value) -> FlowGraph {
        let document: GraphDocument = serde_json::from_value(doc).unwrap();
        FlowGraph::from_document(document)
    }

    #[test]
    fn reports_all_violations_at_once() {
        let g = graph(json!({
            "nodes": [
                { "id": "i", "shape": "if",
                  "properties": { "value": "x", "valueType": "EXPRESSION",
                                  "trueBranch": "missing-a", "falseBranch": "missing-b" } },
                { "id": "u", "shape": "mystery", "next": "missing-c" }
            ],
            "vars": []
        }));

        let issues = validate_graph(&g);
        let integrity = issues
            .iter()
            .filter(|i| matches!(i, CompileIssue::GraphIntegrity { .. }))
            .count();
        // No start node + three dangling references.
        assert_eq!(integrity, 4);
        assert!(issues
            .iter()
            .any(|i| matches!(i, CompileIssue::UnsupportedNodeKind { shape, .. } if shape == "mystery")));
    }

    #[test]
    fn issues_follow_document_order() {
        let g = graph(json!({
            "nodes": [
                { "id": "s", "shape": "start", "next": "n1" },
                { "id": "n1", "shape": "assign",
                  "properties": { "key": ["logic", "VT_a"], "value": 1, "valueType": "FIXED" },
                  "next": "ghost1" },
                { "id": "n2", "shape": "assign",
                  "properties": { "key": ["logic", "VT_b"], "value": 2, "valueType": "FIXED" },
                  "next": "ghost2" }
            ],
            "vars": []
        }));

        let details: Vec<String> = validate_graph(&g)
            .iter()
            .map(|i| i.to_string())
            .collect();
        assert_eq!(details.len(), 2);
        assert!(details[0].contains("ghost1"));
        assert!(details[1].contains("ghost2"));
    }

    #[test]
    fn sound_graph_produces_no_issues() {
        let g = graph(json!({
            "nodes": [
                { "id": "s", "shape": "start", "next": "a" },
                { "id": "a", "shape": "assign",
                  "properties": { "key": ["logic", "VT_x"], "value": "1", "valueType": "FIXED" },
                  "next": "e" },
                { "id": "e", "shape": "end" }
            ],
            "vars": []
        }));
        assert!(validate_graph(&g).is_empty());
    }
}
