//! # Diagnostic Back-Mapping
//!
//! Takes the host compiler's offset-based diagnostics and attributes each one
//! to the graph node (and, when possible, the node property) whose emitted
//! span contains the offset. The offending line is recovered by scanning the
//! generated text itself for newline boundaries; the host's own line/column
//! numbering is never consulted.

use crate::external::{Diagnostic, Severity};

use super::emission::{resolve, resolve_property, ProvenanceRange};

/// Attribution used when no provenance range contains a diagnostic offset,
/// or when containment is ambiguous.
pub const UNKNOWN_NODE: &str = "unknown";

/// A host diagnostic mapped back onto the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDiagnostic {
    /// Owning node id, or [`UNKNOWN_NODE`].
    pub node_id: String,
    /// Owning property within that node's span, when the offset falls inside
    /// a recorded sub-range.
    pub property: Option<String>,
    pub severity: Severity,
    pub message: String,
    /// The full generated-source line containing the offset, trimmed.
    pub line_text: String,
}

/// Maps every host diagnostic to its owning node/property.
pub fn attribute_diagnostics(
    source: &str,
    ranges: &[ProvenanceRange],
    diagnostics: &[Diagnostic],
) -> Vec<NodeDiagnostic> {
    diagnostics
        .iter()
        .map(|diagnostic| {
            let range = resolve(ranges, diagnostic.offset);
            let property = range
                .and_then(|r| resolve_property(r, diagnostic.offset))
                .map(|p| p.name.clone());
            NodeDiagnostic {
                node_id: range
                    .map(|r| r.node_id.clone())
                    .unwrap_or_else(|| UNKNOWN_NODE.to_string()),
                property,
                severity: diagnostic.severity,
                message: diagnostic.message.clone(),
                line_text: line_at(source, diagnostic.offset).trim().to_string(),
            }
        })
        .collect()
}

/// The line of `source` containing byte `offset`, found by scanning backward
/// and forward to the nearest newlines. Offsets past the end (or inside a
/// multi-byte character) are clamped to the previous character boundary.
pub fn line_at(source: &str, offset: usize) -> &str {
    let mut offset = offset.min(source.len());
    while offset > 0 && !source.is_char_boundary(offset) {
        offset -= 1;
    }

    let start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i);
    &source[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_at_finds_surrounding_newlines() {
        let source = "let a = 1;\nlet b = 2;\nlet c = 3;";
        let offset = source.find('b').unwrap();
        assert_eq!(line_at(source, offset), "let b = 2;");
        assert_eq!(line_at(source, 0), "let a = 1;");
        assert_eq!(line_at(source, source.len()), "let c = 3;");
        assert_eq!(line_at(source, source.len() + 100), "let c = 3;");
    }

    #[test]
    fn line_at_clamps_inside_multibyte_characters() {
        let source = "let 变量 = 1;\n";
        // An offset landing mid-character must not panic.
        let mid = source.find('变').unwrap() + 1;
        assert_eq!(line_at(source, mid), "let 变量 = 1;");
    }

    #[test]
    fn unresolved_offsets_report_unknown() {
        let source = "// banner\nlet x = 1;\n";
        let ranges = vec![ProvenanceRange {
            node_id: "a".to_string(),
            start: 10,
            end: source.len(),
            properties: Vec::new(),
        }];
        let diagnostics = vec![Diagnostic {
            offset: 0,
            length: None,
            severity: Severity::Warning,
            message: "stray banner".to_string(),
        }];

        let report = attribute_diagnostics(source, &ranges, &diagnostics);
        assert_eq!(report[0].node_id, UNKNOWN_NODE);
        assert_eq!(report[0].property, None);
        assert_eq!(report[0].line_text, "// banner");
    }
}
