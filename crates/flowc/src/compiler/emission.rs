//! # Provenance-Mapped Emission Buffer
//!
//! Renders the statement tree into final source text while recording, for
//! every node, the half-open byte range `[start, end)` its emission occupies,
//! plus named sub-ranges for individual properties. Ranges are created the
//! instant a node's emission begins and sealed the instant it completes;
//! they are immutable afterwards.
//!
//! Resolution maps a diagnostic offset back to the owning node by interval
//! containment, preferring the smallest enclosing range when ranges nest.

use super::statement::{LinePart, NodeEmission, Stmt};
use super::EmitOptions;

/// Attribution of one generated text span to the node that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceRange {
    pub node_id: String,
    pub start: usize,
    pub end: usize,
    /// Property-level sub-ranges, in emission order.
    pub properties: Vec<PropertyRange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRange {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl ProvenanceRange {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl PropertyRange {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Marker returned by [`EmissionBuffer::begin_node`]; sealing consumes it, so
/// a frame cannot be closed twice.
#[derive(Debug)]
pub struct NodeMarker(usize);

#[derive(Debug)]
struct Frame {
    node_id: String,
    start: usize,
    properties: Vec<PropertyRange>,
}

/// The single emission buffer of a compile pass.
#[derive(Debug, Default)]
pub struct EmissionBuffer {
    text: String,
    ranges: Vec<ProvenanceRange>,
    frames: Vec<Frame>,
}

impl EmissionBuffer {
    pub fn new() -> Self {
        EmissionBuffer::default()
    }

    /// Current end-of-text offset.
    pub fn offset(&self) -> usize {
        self.text.len()
    }

    /// Opens a provenance frame for `node_id` at the current offset.
    pub fn begin_node(&mut self, node_id: &str) -> NodeMarker {
        self.frames.push(Frame {
            node_id: node_id.to_string(),
            start: self.text.len(),
            properties: Vec::new(),
        });
        NodeMarker(self.frames.len() - 1)
    }

    pub fn emit_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Appends `text` and records it as the sub-range of property `name` on
    /// the innermost open frame.
    pub fn emit_property(&mut self, name: &str, text: &str) {
        let start = self.text.len();
        self.text.push_str(text);
        if let Some(frame) = self.frames.last_mut() {
            frame.properties.push(PropertyRange {
                name: name.to_string(),
                start,
                end: self.text.len(),
            });
        }
    }

    /// Seals the node's range at the current offset. Frames must close in
    /// LIFO order; the marker enforces that statically for well-typed users
    /// and the assert catches the rest.
    pub fn end_node(&mut self, marker: NodeMarker) -> ProvenanceRange {
        debug_assert_eq!(marker.0, self.frames.len() - 1, "provenance frames must nest");
        let frame = self.frames.pop().expect("end_node without begin_node");
        let range = ProvenanceRange {
            node_id: frame.node_id,
            start: frame.start,
            end: self.text.len(),
            properties: frame.properties,
        };
        self.ranges.push(range.clone());
        range
    }

    pub fn finish(self) -> (String, Vec<ProvenanceRange>) {
        debug_assert!(self.frames.is_empty(), "unsealed provenance frames at finish");
        let mut ranges = self.ranges;
        // Child frames seal before their parents; re-order to final-text
        // order (outer ranges before the ranges they contain).
        ranges.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        (self.text, ranges)
    }
}

/// Renders a walked statement tree into text plus its provenance list.
pub fn render(emissions: &[NodeEmission], options: &EmitOptions) -> (String, Vec<ProvenanceRange>) {
    let mut buffer = EmissionBuffer::new();
    if options.banner {
        buffer.emit_text("// Auto-generated code from flow graph\n");
        buffer.emit_text("// DO NOT EDIT - changes will be overwritten\n\n");
    }
    render_scope(&mut buffer, emissions, 0, options);
    buffer.finish()
}

fn render_scope(
    buffer: &mut EmissionBuffer,
    emissions: &[NodeEmission],
    depth: usize,
    options: &EmitOptions,
) {
    for emission in emissions {
        let marker = buffer.begin_node(&emission.node_id);
        render_stmts(buffer, &emission.stmts, depth, options);
        buffer.end_node(marker);
    }
}

fn render_stmts(buffer: &mut EmissionBuffer, stmts: &[Stmt], depth: usize, options: &EmitOptions) {
    for stmt in stmts {
        match stmt {
            Stmt::Line(line) => {
                buffer.emit_text(&" ".repeat(options.indent_width * depth));
                for part in &line.parts {
                    match part {
                        LinePart::Text(text) => buffer.emit_text(text),
                        LinePart::Property { name, text } => buffer.emit_property(name, text),
                    }
                }
                buffer.emit_text("\n");
            }
            Stmt::Indented(inner) => render_stmts(buffer, inner, depth + 1, options),
            Stmt::Scope(inner) => render_scope(buffer, inner, depth + 1, options),
        }
    }
}

/// Innermost range containing `offset`: smallest length wins; a tie between
/// distinct ranges is genuinely ambiguous and resolves to `None` rather than
/// a guess.
pub fn resolve(ranges: &[ProvenanceRange], offset: usize) -> Option<&ProvenanceRange> {
    let mut best: Option<&ProvenanceRange> = None;
    let mut ambiguous = false;
    for range in ranges.iter().filter(|r| r.contains(offset)) {
        match best {
            Some(current) if range.len() == current.len() => ambiguous = true,
            Some(current) if range.len() < current.len() => {
                best = Some(range);
                ambiguous = false;
            }
            None => best = Some(range),
            _ => {}
        }
    }
    if ambiguous {
        None
    } else {
        best
    }
}

/// Property owning `offset` within a node's own span, if any.
pub fn resolve_property(range: &ProvenanceRange, offset: usize) -> Option<&PropertyRange> {
    range.properties.iter().find(|p| p.contains(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::statement::Line;

    fn opts() -> EmitOptions {
        EmitOptions { banner: false, ..EmitOptions::default() }
    }

    #[test]
    fn seals_ranges_in_text_order() {
        let mut buffer = EmissionBuffer::new();
        let a = buffer.begin_node("a");
        buffer.emit_text("let x = 1;\n");
        buffer.end_node(a);
        let b = buffer.begin_node("b");
        buffer.emit_text("let y = 2;\n");
        buffer.end_node(b);

        let (text, ranges) = buffer.finish();
        assert_eq!(text, "let x = 1;\nlet y = 2;\n");
        assert_eq!(ranges.len(), 2);
        assert_eq!((ranges[0].start, ranges[0].end), (0, 11));
        assert_eq!((ranges[1].start, ranges[1].end), (11, 22));
        assert!(ranges[0].end <= ranges[1].start);
    }

    #[test]
    fn nested_frames_produce_nested_ranges() {
        let mut buffer = EmissionBuffer::new();
        let outer = buffer.begin_node("if1");
        buffer.emit_text("if (x) {\n");
        let inner = buffer.begin_node("assign1");
        buffer.emit_text("    let y = 1;\n");
        buffer.end_node(inner);
        buffer.emit_text("}\n");
        buffer.end_node(outer);

        let (text, ranges) = buffer.finish();
        // Outer first after finish(), despite sealing last.
        assert_eq!(ranges[0].node_id, "if1");
        assert_eq!(ranges[1].node_id, "assign1");
        assert!(ranges[0].start <= ranges[1].start && ranges[1].end <= ranges[0].end);

        let inside_assign = text.find("let y").unwrap();
        assert_eq!(resolve(&ranges, inside_assign).unwrap().node_id, "assign1");
        let on_if_header = text.find("if (").unwrap();
        assert_eq!(resolve(&ranges, on_if_header).unwrap().node_id, "if1");
    }

    #[test]
    fn property_subranges_are_recorded_at_write_time() {
        let mut buffer = EmissionBuffer::new();
        let marker = buffer.begin_node("a");
        buffer.emit_text("let ");
        buffer.emit_property("key", "VT_x");
        buffer.emit_text(" = ");
        buffer.emit_property("value", "\"dddd\"");
        buffer.emit_text(";\n");
        let range = buffer.end_node(marker);

        let (text, _) = buffer.finish();
        let value = &range.properties[1];
        assert_eq!(value.name, "value");
        assert_eq!(&text[value.start..value.end], "\"dddd\"");
        assert_eq!(resolve_property(&range, value.start).unwrap().name, "value");
        assert!(resolve_property(&range, 0).is_none());
    }

    #[test]
    fn resolve_outside_all_ranges_is_none() {
        let mut buffer = EmissionBuffer::new();
        buffer.emit_text("// banner\n");
        let marker = buffer.begin_node("a");
        buffer.emit_text("let x = 1;\n");
        buffer.end_node(marker);
        let (_, ranges) = buffer.finish();
        assert!(resolve(&ranges, 0).is_none());
        assert!(resolve(&ranges, 10_000).is_none());
    }

    #[test]
    fn render_indents_nested_scopes() {
        let emissions = vec![NodeEmission {
            node_id: "if1".into(),
            stmts: vec![
                Stmt::line("if (c) {"),
                Stmt::Scope(vec![NodeEmission {
                    node_id: "a1".into(),
                    stmts: vec![Stmt::Line(Line::new().text("let x = ").prop("value", "1").text(";"))],
                }]),
                Stmt::line("} else {"),
                Stmt::Scope(Vec::new()),
                Stmt::line("}"),
            ],
        }];

        let (text, ranges) = render(&emissions, &opts());
        assert_eq!(text, "if (c) {\n    let x = 1;\n} else {\n}\n");
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].node_id, "if1");
        assert_eq!(ranges[1].node_id, "a1");
    }
}
