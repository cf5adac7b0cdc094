//! # Emitted Statement Tree
//!
//! Emitters return structured statements instead of strings so the emission
//! buffer can record every node's (and property's) exact text range at write
//! time. No substring searching happens anywhere.

/// Everything emitted for one visited node, in output order. Nested scopes
/// ([`Stmt::Scope`]) hold other nodes' emissions, which is what makes their
/// provenance ranges nest inside this node's range.
#[derive(Debug, Clone)]
pub struct NodeEmission {
    pub node_id: String,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// One complete output line at the current indent level.
    Line(Line),
    /// Same-node statements rendered one indent level deeper (case labels,
    /// loop item bindings, request-configuration bodies).
    Indented(Vec<Stmt>),
    /// A recursively walked child scope, one indent level deeper.
    Scope(Vec<NodeEmission>),
}

/// A single output line assembled from plain text and property-tagged parts.
#[derive(Debug, Clone, Default)]
pub struct Line {
    pub parts: Vec<LinePart>,
}

#[derive(Debug, Clone)]
pub enum LinePart {
    Text(String),
    /// Text attributed to a named node property; the buffer records its
    /// `[start, end)` sub-range as it writes.
    Property { name: String, text: String },
}

impl Line {
    pub fn new() -> Self {
        Line::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(LinePart::Text(text.into()));
        self
    }

    pub fn prop(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.parts.push(LinePart::Property { name: name.into(), text: text.into() });
        self
    }
}

impl Stmt {
    /// Shorthand for a plain one-part line.
    pub fn line(text: impl Into<String>) -> Self {
        Stmt::Line(Line::new().text(text))
    }
}
