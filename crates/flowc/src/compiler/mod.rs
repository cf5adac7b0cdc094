//! # Flow Graph Compiler
//!
//! Turns a parsed [`FlowGraph`](crate::graph::FlowGraph) into host source
//! text with a byte-accurate provenance map, then (optionally) runs the text
//! through an external host compiler and attributes every diagnostic back to
//! the graph node and property that produced the offending span.
//!
//! The pass is deliberately total: node-level problems become entries of an
//! aggregate issue list while emission continues, so an editor always gets
//! the best output the graph allows plus a complete problem report.

pub mod diagnostics;
pub mod emission;
pub mod emitters;
pub mod statement;
pub mod validation;
pub mod walker;


use thiserror::Error;
use tracing::debug;

use crate::external::{ExpressionEvaluator, ExternalCompileError, HostCompiler};
use crate::graph::FlowGraph;

pub use diagnostics::{attribute_diagnostics, NodeDiagnostic, UNKNOWN_NODE};
pub use emission::{ProvenanceRange, PropertyRange};
pub use validation::validate_graph;
pub use walker::FlowWalker;

/// Rendering knobs for [`emit_flow`].
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Prefix the output with the generated-code banner.
    pub banner: bool,
    /// Spaces per indent level.
    pub indent_width: usize,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions { banner: true, indent_width: 4 }
    }
}

/// A recoverable, node-scoped problem found while walking or validating a
/// graph. Issues accumulate; they never abort the pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileIssue {
    #[error("graph integrity: {detail}")]
    GraphIntegrity { detail: String },
    #[error("invalid properties on node `{node_id}` (shape `{shape}`): {detail}")]
    InvalidNodeProperties {
        node_id: String,
        shape: String,
        detail: String,
    },
    #[error("no emitter for node `{node_id}` (shape `{shape}`)")]
    UnsupportedNodeKind { node_id: String, shape: String },
}

/// A failure that aborts the compile pass outright. Currently only the host
/// compiler capability can fail this way; everything graph-shaped degrades
/// into a [`CompileIssue`] instead.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    ExternalCompile(#[from] ExternalCompileError),
}

/// Output of the emission phase: source text, its provenance map, and every
/// issue the walk encountered.
#[derive(Debug, Clone)]
pub struct FlowEmission {
    pub source: String,
    /// Text order, outer ranges before the ranges they contain.
    pub provenance: Vec<ProvenanceRange>,
    pub issues: Vec<CompileIssue>,
}

impl FlowEmission {
    /// Innermost node range containing `offset`, if any.
    pub fn resolve(&self, offset: usize) -> Option<&ProvenanceRange> {
        emission::resolve(&self.provenance, offset)
    }

    /// Id of the node owning `offset`, or [`UNKNOWN_NODE`].
    pub fn node_at(&self, offset: usize) -> &str {
        self.resolve(offset).map_or(UNKNOWN_NODE, |r| r.node_id.as_str())
    }
}

/// Output of the full compile pass: emission artifacts plus the host
/// compiler's diagnostics mapped back onto the graph.
#[derive(Debug, Clone)]
pub struct FlowCompileResult {
    pub source: String,
    pub provenance: Vec<ProvenanceRange>,
    pub issues: Vec<CompileIssue>,
    pub diagnostics: Vec<NodeDiagnostic>,
    /// Transpiled output from the host compiler, when it produces one.
    pub output_text: Option<String>,
}

/// Walks `graph` and renders it to source text. Never fails; structural
/// problems surface through [`FlowEmission::issues`] alongside whatever text
/// could still be produced.
pub fn emit_flow(
    graph: &FlowGraph,
    evaluator: &dyn ExpressionEvaluator,
    options: &EmitOptions,
) -> FlowEmission {
    let (emissions, issues) = FlowWalker::new(graph, evaluator).walk();
    let (source, provenance) = emission::render(&emissions, options);
    debug!(
        bytes = source.len(),
        ranges = provenance.len(),
        issues = issues.len(),
        "flow emission complete"
    );
    FlowEmission { source, provenance, issues }
}

/// Full pipeline: emit, hand the text to the host compiler, and attribute
/// its diagnostics back to nodes and properties.
pub fn compile_flow(
    graph: &FlowGraph,
    evaluator: &dyn ExpressionEvaluator,
    host: &dyn HostCompiler,
    options: &EmitOptions,
) -> Result<FlowCompileResult, CompileError> {
    let emitted = emit_flow(graph, evaluator, options);
    let output = host.compile(&emitted.source)?;
    let diagnostics = attribute_diagnostics(&emitted.source, &emitted.provenance, &output.diagnostics);
    debug!(diagnostics = diagnostics.len(), "host compile complete");
    Ok(FlowCompileResult {
        source: emitted.source,
        provenance: emitted.provenance,
        issues: emitted.issues,
        diagnostics,
        output_text: output.output_text,
    })
}
