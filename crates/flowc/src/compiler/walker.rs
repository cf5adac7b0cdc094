//! # Graph Walker
//!
//! Drives emission by following `next` links from the start node and
//! descending into branch, case, and loop-body scopes. Each scope is a
//! separate recursive invocation returning its own statement list; there is
//! no shared traversal cursor, so a nested scope can never corrupt a sibling
//! scope's position and provenance ranges nest correctly.
//!
//! Node-level failures never unwind the pass: they become entries of the
//! aggregate issue list and emission proceeds best-effort.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::external::ExpressionEvaluator;
use crate::graph::{FlowGraph, Node, NodeKind, VariableTable};

use super::statement::NodeEmission;
use super::CompileIssue;

pub struct FlowWalker<'a> {
    pub(super) graph: &'a FlowGraph,
    pub(super) evaluator: &'a dyn ExpressionEvaluator,
    pub(super) vars: VariableTable,
    /// Ids visited anywhere in the pass. A revisit of a non-`end` node means
    /// either a plain-`next` cycle or a node owned by more than one scope;
    /// both are integrity violations, not supported constructs.
    visited: HashSet<String>,
    pub(super) issues: Vec<CompileIssue>,
    /// Pass-wide sequence for call parameter bindings, so names stay unique
    /// across multiple call nodes.
    pub(super) param_seq: usize,
}

impl<'a> FlowWalker<'a> {
    pub fn new(graph: &'a FlowGraph, evaluator: &'a dyn ExpressionEvaluator) -> Self {
        FlowWalker {
            graph,
            evaluator,
            vars: VariableTable::new(graph.variables()),
            visited: HashSet::new(),
            issues: Vec::new(),
            param_seq: 0,
        }
    }

    /// Walks the whole graph from its start node. Always returns whatever
    /// could be emitted, alongside the issues encountered on the way.
    pub fn walk(mut self) -> (Vec<NodeEmission>, Vec<CompileIssue>) {
        let emissions = match self.graph.find_start() {
            Some(start) => {
                debug!(start = %start.id, "walking flow graph");
                let seed = start.id.clone();
                self.walk_scope(Some(&seed))
            }
            None => {
                self.issues.push(CompileIssue::GraphIntegrity {
                    detail: format!(
                        "graph must contain exactly one start node, found {}",
                        self.graph.start_count()
                    ),
                });
                Vec::new()
            }
        };
        (emissions, self.issues)
    }

    /// Walks one chain of `next` links. Branch/case/loop bodies re-enter here
    /// with their own seed and return their own list.
    pub(super) fn walk_scope(&mut self, seed: Option<&str>) -> Vec<NodeEmission> {
        let mut emissions = Vec::new();
        let mut current = seed.map(str::to_owned);

        while let Some(id) = current {
            let Some(node) = self.graph.find_node(&id) else {
                warn!(node_id = %id, "dangling node reference, stopping this chain");
                self.issues.push(CompileIssue::GraphIntegrity {
                    detail: format!("reference to missing node `{id}`"),
                });
                break;
            };

            // End terminates the chain and emits nothing. Several branches
            // may legitimately converge on the same end node, so it is
            // exempt from the revisit check.
            if matches!(node.kind, NodeKind::End { .. }) {
                break;
            }

            if !self.visited.insert(id.clone()) {
                self.issues.push(CompileIssue::GraphIntegrity {
                    detail: format!(
                        "node `{id}` is reachable more than once (cycle outside a loop, \
                         or a node shared between scopes)"
                    ),
                });
                break;
            }

            if let Some(emission) = self.emit_node(node) {
                emissions.push(emission);
            }
            current = node.next.clone();
        }

        emissions
    }

    pub(super) fn emit_node(&mut self, node: &Node) -> Option<NodeEmission> {
        let stmts = match &node.kind {
            // Pure traversal anchor.
            NodeKind::Start => return None,
            // Handled by walk_scope before dispatch.
            NodeKind::End { .. } => return None,
            NodeKind::Assign(props) => self.emit_assign(node, props),
            NodeKind::If(props) => self.emit_if(props),
            NodeKind::Switch(props) => self.emit_switch(props),
            NodeKind::Loop(props) => self.emit_loop(props),
            NodeKind::Call(props) => self.emit_call(props),
            NodeKind::Unsupported { shape } => {
                warn!(node_id = %node.id, shape = %shape, "unsupported node shape, emitting no-op");
                self.issues.push(CompileIssue::UnsupportedNodeKind {
                    node_id: node.id.clone(),
                    shape: shape.clone(),
                });
                self.placeholder(shape)
            }
            NodeKind::Invalid { shape, detail } => {
                warn!(node_id = %node.id, shape = %shape, "invalid node properties, emitting no-op");
                self.issues.push(CompileIssue::InvalidNodeProperties {
                    node_id: node.id.clone(),
                    shape: shape.clone(),
                    detail: detail.clone(),
                });
                self.placeholder(shape)
            }
        };
        Some(NodeEmission { node_id: node.id.clone(), stmts })
    }
}
