//! # External Capability Contracts
//!
//! The compiler core leans on two collaborators it does not own:
//!
//! 1. An **expression evaluator** ("FormulaEditor") that turns a raw formula
//!    string into a runtime-evaluable rendering. The core never parses
//!    formula grammar itself.
//! 2. A **host compiler** that type-checks the generated source text and
//!    reports diagnostics as byte offsets into it.
//!
//! Both are traits so tests (and embedders) can substitute their own.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resolves EXPRESSION-tagged values into host-language expression text.
///
/// Invoked once per EXPRESSION value encountered during emission. The returned
/// string is spliced verbatim into the generated source.
pub trait ExpressionEvaluator {
    fn evaluate(&self, expression: &str) -> String;
}

/// Default evaluator: renders each formula as a call into the host page's
/// `FormulaEditor` runtime, deferring actual evaluation to execution time.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormulaRuntime;

impl ExpressionEvaluator for FormulaRuntime {
    fn evaluate(&self, expression: &str) -> String {
        format!("new FormulaEditor().parse(\"{}\")", expression.escape_default())
    }
}

/// The host type-checker/compiler, seen purely as "source text in,
/// diagnostics (and optionally transpiled output) out".
pub trait HostCompiler {
    fn compile(&self, source: &str) -> Result<HostCompileOutput, ExternalCompileError>;
}

/// Result of handing generated source to the host compiler.
#[derive(Debug, Clone, Default)]
pub struct HostCompileOutput {
    pub diagnostics: Vec<Diagnostic>,
    pub output_text: Option<String>,
}

/// A single host-compiler diagnostic. `offset` is a byte offset into the
/// source text the core handed over; `length` may be absent for file-level
/// messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub offset: usize,
    #[serde(default)]
    pub length: Option<usize>,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Hard failure of the host compile capability itself (malformed input text,
/// service unavailable). Unlike a diagnostic, this aborts the compile pass.
#[derive(Debug, Clone, Error)]
#[error("external compiler failed: {message}")]
pub struct ExternalCompileError {
    pub message: String,
}

impl ExternalCompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
