//! # flowc
//!
//! A compiler from visual flow graphs to host source text, with a
//! byte-accurate provenance map linking every emitted span back to the graph
//! node (and node property) that produced it.
//!
//! The pipeline has three phases:
//!
//! 1. **Parse** a JSON graph document into a typed [`graph::FlowGraph`].
//! 2. **Emit** via [`compiler::emit_flow`]: walk the graph from its start
//!    node, render each node's statements, and record provenance ranges as
//!    the text is written.
//! 3. **Check** via [`compiler::compile_flow`]: hand the text to an external
//!    [`external::HostCompiler`] and attribute its offset-based diagnostics
//!    back to nodes, properties, and source lines.
//!
//! Emission is best-effort by design. Structural problems (dangling links,
//! unknown shapes, malformed properties) become [`compiler::CompileIssue`]
//! entries while the rest of the graph still renders, so editors always get
//! both partial output and a complete problem report.

pub mod compiler;
pub mod external;
pub mod graph;

pub use compiler::{
    compile_flow, emit_flow, validate_graph, CompileError, CompileIssue, EmitOptions,
    FlowCompileResult, FlowEmission, NodeDiagnostic, PropertyRange, ProvenanceRange,
};
pub use external::{
    Diagnostic, ExpressionEvaluator, ExternalCompileError, FormulaRuntime, HostCompileOutput,
    HostCompiler, Severity,
};
pub use graph::{FlowGraph, GraphDocument};
