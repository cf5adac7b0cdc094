//! # Flow Graph Model
//!
//! The typed node graph and variable table the compiler consumes. Pure data:
//! lookups only, no emission logic.
//!
//! A graph arrives as a JSON document `{ "nodes": [...], "vars": [...] }`.
//! Node order in the document is *not* traversal order; traversal follows
//! `next` and branch links. Each node's shape-specific payload is parsed into
//! a tagged variant so downstream validation is a total pattern match rather
//! than ad-hoc field probing. Parsing is per-node lenient: a node with an
//! unknown shape or malformed properties degrades to a placeholder variant
//! (keeping its `next` link) instead of poisoning the whole document.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// A complete flow graph: nodes indexed by id plus the variable manifest.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: HashMap<String, Node>,
    /// Node ids in document order. Iteration and reporting follow this, not
    /// the map, so output stays stable across runs.
    order: Vec<String>,
    variables: Vec<Variable>,
}

/// Wire shape of a graph document.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub vars: Vec<Variable>,
}

/// A node as it appears on the wire, before its properties are parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub shape: String,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub next: Option<String>,
}

/// One vertex of the flow graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    /// Successor in the current chain. Absent = terminal for that branch.
    pub next: Option<String>,
}

/// Shape-discriminated payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Start,
    End {
        /// Binding consumed by downstream tooling only; emits nothing here.
        result: Option<ResultBinding>,
    },
    Assign(AssignProps),
    If(IfProps),
    Switch(SwitchProps),
    Loop(LoopProps),
    Call(CallProps),
    /// Shape this compiler does not recognize. The walker emits a placeholder
    /// and reports it, so partial output stays useful.
    Unsupported { shape: String },
    /// Known shape whose properties failed validation at document load.
    /// Keeping the node (with its `next` link) lets traversal continue.
    Invalid { shape: String, detail: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignProps {
    /// Scoped identifier, e.g. `["logic", "VT_aaa"]`. The last element is the
    /// generated variable name.
    pub key: Vec<String>,
    #[serde(flatten)]
    pub value: ValueExpr,
    #[serde(default)]
    pub data_type: Option<DataType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfProps {
    #[serde(flatten)]
    pub condition: ValueExpr,
    #[serde(default)]
    pub true_branch: Option<String>,
    #[serde(default)]
    pub false_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchProps {
    #[serde(flatten)]
    pub discriminant: ValueExpr,
    /// Declaration order is significant and preserved exactly.
    #[serde(default)]
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchCase {
    pub match_value: Value,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopProps {
    /// List-producing expression; resolved once, reused for length and
    /// element access.
    pub loop_list_expr: ValueExpr,
    #[serde(default)]
    pub loop_item_name: Option<String>,
    #[serde(default)]
    pub loop_index_name: Option<String>,
    #[serde(default)]
    pub body_start: Option<String>,
    /// Declared body membership. Emission follows `next` links from
    /// `body_start`; members unreachable that way are not emitted.
    #[serde(default)]
    pub body: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallProps {
    pub chain_id: String,
    #[serde(default)]
    pub params: Vec<CallParam>,
    #[serde(default)]
    pub result: Option<ResultBinding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParam {
    pub key: String,
    #[serde(flatten)]
    pub value: ValueExpr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultBinding {
    pub key: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<DataType>,
}

/// End-node wrapper; `properties.result` is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct EndProps {
    #[serde(default)]
    result: Option<ResultBinding>,
}

/// A tagged datum: either a literal (`FIXED`) or a raw expression string
/// resolved through the external evaluator at emission time (`EXPRESSION`).
/// The tag fully determines rendering; no other tags are valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueExpr {
    #[serde(default)]
    pub value: Value,
    pub value_type: ValueTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueTag {
    Fixed,
    Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Object,
    #[serde(other)]
    Void,
}

/// Entry in the graph's variable manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub key: String,
    pub name: String,
    pub data_type: DataType,
    #[serde(rename = "varType")]
    pub role: VarRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarRole {
    Input,
    Output,
    Local,
}

impl Node {
    fn from_raw(raw: RawNode) -> Self {
        let RawNode { id, shape, properties, next } = raw;
        let kind = NodeKind::parse(&shape, properties);
        Node { id, kind, next }
    }
}

impl NodeKind {
    /// Parse a shape-specific payload. Unknown shapes and malformed
    /// properties degrade to placeholder variants rather than failing the
    /// whole document; the walker reports them during emission.
    fn parse(shape: &str, properties: Value) -> Self {
        fn props<T: serde::de::DeserializeOwned>(shape: &str, value: Value) -> Result<T, String> {
            serde_json::from_value(value)
                .map_err(|e| format!("invalid {shape} properties: {e}"))
        }

        let result = match shape {
            "start" => Ok(NodeKind::Start),
            "end" => {
                let parsed = if properties.is_null() {
                    EndProps::default()
                } else {
                    match props::<EndProps>(shape, properties) {
                        Ok(p) => p,
                        Err(detail) => return NodeKind::Invalid { shape: shape.to_string(), detail },
                    }
                };
                Ok(NodeKind::End { result: parsed.result })
            }
            "assign" => props(shape, properties).map(NodeKind::Assign),
            "if" => props(shape, properties).map(NodeKind::If),
            "switch" => props(shape, properties).map(NodeKind::Switch),
            "loop" => props(shape, properties).map(NodeKind::Loop),
            "call" => props(shape, properties).map(NodeKind::Call),
            other => Ok(NodeKind::Unsupported { shape: other.to_string() }),
        };

        match result {
            Ok(kind) => kind,
            Err(detail) => NodeKind::Invalid { shape: shape.to_string(), detail },
        }
    }

    /// The wire-format discriminator for this kind.
    pub fn shape(&self) -> &str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End { .. } => "end",
            NodeKind::Assign(_) => "assign",
            NodeKind::If(_) => "if",
            NodeKind::Switch(_) => "switch",
            NodeKind::Loop(_) => "loop",
            NodeKind::Call(_) => "call",
            NodeKind::Unsupported { shape } | NodeKind::Invalid { shape, .. } => shape,
        }
    }
}

impl FlowGraph {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let document: GraphDocument = serde_json::from_str(text)?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: GraphDocument) -> Self {
        let mut nodes = HashMap::with_capacity(document.nodes.len());
        let mut order = Vec::with_capacity(document.nodes.len());
        for raw in document.nodes {
            let node = Node::from_raw(raw);
            let id = node.id.clone();
            if let Some(previous) = nodes.insert(id.clone(), node) {
                // First occurrence wins; the eager validator reports the rest.
                warn!(node_id = %previous.id, "duplicate node id in graph document");
                nodes.insert(previous.id.clone(), previous);
            } else {
                order.push(id);
            }
        }
        FlowGraph { nodes, order, variables: document.vars }
    }

    /// Lazy lookup. A `None` at a dereference site is a dangling reference
    /// and becomes a graph-integrity issue there.
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// The unique `start` node, if exactly one exists. Zero or several start
    /// nodes are integrity violations surfaced by the caller.
    pub fn find_start(&self) -> Option<&Node> {
        let mut starts = self
            .nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::Start));
        match (starts.next(), starts.next()) {
            (Some(node), None) => Some(node),
            _ => None,
        }
    }

    pub fn start_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::Start))
            .count()
    }

    /// Nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }
}

/// The variable side table. Populated once from the document's manifest and
/// read by emitters; the walker never mutates the manifest itself. Emitters
/// may push extra locals (loop item/index bindings) scoped to a loop body.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    globals: Vec<Variable>,
    locals: Vec<Variable>,
}

impl VariableTable {
    pub fn new(globals: &[Variable]) -> Self {
        VariableTable { globals: globals.to_vec(), locals: Vec::new() }
    }

    /// Innermost binding for `key`: loop-scoped locals shadow the manifest.
    pub fn lookup(&self, key: &str) -> Option<&Variable> {
        self.locals
            .iter()
            .rev()
            .find(|v| v.key == key)
            .or_else(|| self.globals.iter().find(|v| v.key == key))
    }

    /// Opens a local scope; pass the returned mark to [`end_scope`].
    ///
    /// [`end_scope`]: VariableTable::end_scope
    pub fn begin_scope(&mut self) -> usize {
        self.locals.len()
    }

    pub fn push_local(&mut self, name: &str, data_type: DataType) {
        self.locals.push(Variable {
            key: name.to_string(),
            name: name.to_string(),
            data_type,
            role: VarRole::Local,
        });
    }

    pub fn end_scope(&mut self, mark: usize) {
        self.locals.truncate(mark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph(doc: Value) -> FlowGraph {
        let document: GraphDocument = serde_json::from_value(doc).unwrap();
        FlowGraph::from_document(document)
    }

    #[test]
    fn parses_assign_node_properties() {
        let g = graph(json!({
            "nodes": [
                { "id": "a", "shape": "assign",
                  "properties": { "key": ["logic", "VT_x"], "value": "dddd", "valueType": "FIXED" },
                  "next": "e" },
                { "id": "e", "shape": "end" }
            ],
            "vars": []
        }));

        let node = g.find_node("a").unwrap();
        match &node.kind {
            NodeKind::Assign(p) => {
                assert_eq!(p.key, vec!["logic".to_string(), "VT_x".to_string()]);
                assert_eq!(p.value.value_type, ValueTag::Fixed);
                assert_eq!(p.value.value, json!("dddd"));
            }
            other => panic!("expected assign, got {}", other.shape()),
        }
        assert_eq!(node.next.as_deref(), Some("e"));
    }

    #[test]
    fn unknown_shape_degrades_to_unsupported() {
        let g = graph(json!({
            "nodes": [{ "id": "n", "shape": "teleport", "next": "m" }],
            "vars": []
        }));
        let node = g.find_node("n").unwrap();
        assert!(matches!(&node.kind, NodeKind::Unsupported { shape } if shape == "teleport"));
        assert_eq!(node.next.as_deref(), Some("m"));
    }

    #[test]
    fn malformed_properties_degrade_to_invalid() {
        let g = graph(json!({
            "nodes": [
                { "id": "a", "shape": "assign", "properties": { "value": "x", "valueType": "FIXED" } }
            ],
            "vars": []
        }));
        // Missing `key` field.
        let node = g.find_node("a").unwrap();
        assert!(matches!(&node.kind, NodeKind::Invalid { shape, .. } if shape == "assign"));
    }

    #[test]
    fn find_start_requires_exactly_one() {
        let none = graph(json!({ "nodes": [{ "id": "e", "shape": "end" }], "vars": [] }));
        assert!(none.find_start().is_none());

        let two = graph(json!({
            "nodes": [
                { "id": "s1", "shape": "start" },
                { "id": "s2", "shape": "start" }
            ],
            "vars": []
        }));
        assert!(two.find_start().is_none());
        assert_eq!(two.start_count(), 2);
    }

    #[test]
    fn nodes_iterate_in_document_order() {
        let g = graph(json!({
            "nodes": [
                { "id": "c", "shape": "end" },
                { "id": "a", "shape": "start" },
                { "id": "b", "shape": "end" }
            ],
            "vars": []
        }));
        let ids: Vec<&str> = g.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn variable_manifest_round_trips() {
        let g = graph(json!({
            "nodes": [{ "id": "s", "shape": "start" }],
            "vars": [
                { "varType": "LOCAL", "dataType": "BOOLEAN", "name": "aaa", "key": "VT_aaa" },
                { "varType": "INPUT", "dataType": "NUMBER", "name": "p2", "key": "VT_p2" }
            ]
        }));
        assert_eq!(g.variables().len(), 2);
        assert_eq!(g.variables()[0].data_type, DataType::Boolean);
        assert_eq!(g.variables()[1].role, VarRole::Input);
    }

    #[test]
    fn variable_table_scoping() {
        let g = graph(json!({
            "nodes": [],
            "vars": [{ "varType": "LOCAL", "dataType": "BOOLEAN", "name": "aaa", "key": "VT_aaa" }]
        }));
        let mut table = VariableTable::new(g.variables());

        let mark = table.begin_scope();
        table.push_local("index", DataType::Number);
        table.push_local("VT_aaa", DataType::String);
        assert_eq!(table.lookup("index").unwrap().data_type, DataType::Number);
        // Local shadows the manifest entry.
        assert_eq!(table.lookup("VT_aaa").unwrap().data_type, DataType::String);

        table.end_scope(mark);
        assert!(table.lookup("index").is_none());
        assert_eq!(table.lookup("VT_aaa").unwrap().data_type, DataType::Boolean);
    }

    #[test]
    fn unrecognized_data_type_maps_to_void() {
        let g = graph(json!({
            "nodes": [],
            "vars": [{ "varType": "LOCAL", "dataType": "VOID", "name": "v", "key": "VT_v" }]
        }));
        assert_eq!(g.variables()[0].data_type, DataType::Void);
    }
}
