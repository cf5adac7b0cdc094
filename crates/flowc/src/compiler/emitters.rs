//! # Node Emitters
//!
//! One emission strategy per node shape. Each takes the node's validated
//! properties and produces the statement tree for that node, recursing back
//! into the walker for branch, case, and loop-body scopes.
//!
//! Output is the host page's dialect: `let`/`const` bindings, `if`/`switch`/
//! `for` statements, and `window.request` invocations for external logic
//! chains. FIXED values render as literals by declared data type; EXPRESSION
//! values resolve through the external evaluator.

use serde_json::Value;

use crate::graph::{
    AssignProps, CallProps, DataType, IfProps, LoopProps, Node, SwitchProps, ValueExpr, ValueTag,
};

use super::statement::{Line, Stmt};
use super::walker::FlowWalker;
use super::CompileIssue;

impl FlowWalker<'_> {
    pub(super) fn emit_assign(&mut self, node: &Node, props: &AssignProps) -> Vec<Stmt> {
        let Some(name) = props.key.last().filter(|n| !n.is_empty()) else {
            self.issues.push(CompileIssue::InvalidNodeProperties {
                node_id: node.id.clone(),
                shape: "assign".to_string(),
                detail: "empty variable key".to_string(),
            });
            return self.placeholder("assign");
        };

        let declared = props
            .data_type
            .filter(|t| *t != DataType::Void)
            .or_else(|| self.declared_type(name));
        let rendered = self.resolve_value(&props.value, declared);

        vec![Stmt::Line(
            Line::new()
                .text("let ")
                .prop("key", name)
                .text(" = ")
                .prop("value", rendered)
                .text(";"),
        )]
    }

    pub(super) fn emit_if(&mut self, props: &IfProps) -> Vec<Stmt> {
        let condition = self.resolve_value(&props.condition, None);
        let true_scope = self.walk_scope(props.true_branch.as_deref());
        // An absent branch still gets an empty-but-present alternative block.
        let false_scope = self.walk_scope(props.false_branch.as_deref());

        vec![
            Stmt::Line(Line::new().text("if (").prop("condition", condition).text(") {")),
            Stmt::Scope(true_scope),
            Stmt::line("} else {"),
            Stmt::Scope(false_scope),
            Stmt::line("}"),
        ]
    }

    pub(super) fn emit_switch(&mut self, props: &SwitchProps) -> Vec<Stmt> {
        let discriminant = self.resolve_value(&props.discriminant, None);

        // Declaration order encodes match priority; preserve it exactly.
        let mut clauses = Vec::with_capacity(props.cases.len() * 3);
        for case in &props.cases {
            clauses.push(Stmt::Line(
                Line::new()
                    .text("case ")
                    .prop("case", render_literal(&case.match_value))
                    .text(": {"),
            ));
            clauses.push(Stmt::Scope(self.walk_scope(case.next.as_deref())));
            clauses.push(Stmt::line("}"));
        }

        vec![
            Stmt::Line(Line::new().text("switch (").prop("discriminant", discriminant).text(") {")),
            Stmt::Indented(clauses),
            Stmt::line("}"),
        ]
    }

    pub(super) fn emit_loop(&mut self, props: &LoopProps) -> Vec<Stmt> {
        // Resolved once; the rendered text is reused for the length check and
        // the element access.
        let list = self.resolve_value(&props.loop_list_expr, None);
        let item = props.loop_item_name.as_deref().unwrap_or("item");
        let index = props.loop_index_name.as_deref().unwrap_or("index");

        // Item and index are locals visible only inside the loop body.
        let mark = self.vars.begin_scope();
        self.vars.push_local(index, DataType::Number);
        self.vars.push_local(item, DataType::Void);
        let body = self.walk_scope(props.body_start.as_deref());
        self.vars.end_scope(mark);

        vec![
            Stmt::Line(
                Line::new()
                    .text(format!("for (let {index} = 0; {index} < "))
                    .prop("loopListExpr", list.clone())
                    .text(format!(".length; {index}++) {{")),
            ),
            Stmt::Indented(vec![Stmt::line(format!("const {item} = {list}[{index}];"))]),
            Stmt::Scope(body),
            Stmt::line("}"),
        ]
    }

    pub(super) fn emit_call(&mut self, props: &CallProps) -> Vec<Stmt> {
        let mut stmts = Vec::new();

        // One local binding per parameter, resolved up front.
        let mut bindings = Vec::with_capacity(props.params.len());
        for param in &props.params {
            let binding = format!("paramValue_{}", self.param_seq);
            self.param_seq += 1;
            let rendered = self.resolve_value(&param.value, None);
            stmts.push(Stmt::Line(
                Line::new()
                    .text(format!("const {binding} = "))
                    .prop(&param.key, rendered)
                    .text(";"),
            ));
            bindings.push((param.key.as_str(), binding));
        }

        // Aggregate request configuration for the logic-engine invocation.
        let mut param_lines = Vec::with_capacity(bindings.len());
        for (i, (key, binding)) in bindings.iter().enumerate() {
            let comma = if i + 1 < bindings.len() { "," } else { "" };
            param_lines.push(Stmt::line(format!("{key}: {binding}{comma}")));
        }
        stmts.push(Stmt::line("const requestConfig = {"));
        stmts.push(Stmt::Indented(vec![
            Stmt::line("method: 'post',"),
            Stmt::line("url: '/api/logic-engine/chain/submit',"),
            Stmt::line("data: {"),
            Stmt::Indented(vec![
                Stmt::Line(Line::new().text("chainId: '").prop("chainId", &props.chain_id).text("',")),
                Stmt::line("param: {"),
                Stmt::Indented(param_lines),
                Stmt::line("}"),
            ]),
            Stmt::line("}"),
        ]));
        stmts.push(Stmt::line("};"));

        let invocation = match props.result.as_ref().and_then(|r| r.key.last()) {
            Some(target) => Line::new()
                .prop("result", target)
                .text(" = await window.request(requestConfig);"),
            None => Line::new().text("await window.request(requestConfig);"),
        };
        stmts.push(Stmt::Line(invocation));

        stmts
    }

    /// No-op statement for unsupported/invalid nodes; keeps the rest of the
    /// output compilable while the failure shows up in the issue list.
    pub(super) fn placeholder(&self, shape: &str) -> Vec<Stmt> {
        vec![Stmt::line(format!("; // no emitter for node shape \"{shape}\""))]
    }

    /// Renders a value by its tag: FIXED becomes a literal of the declared
    /// (or inferred) data type, EXPRESSION goes through the evaluator.
    pub(super) fn resolve_value(&self, value: &ValueExpr, declared: Option<DataType>) -> String {
        match value.value_type {
            ValueTag::Expression => match &value.value {
                Value::String(raw) => self.evaluator.evaluate(raw),
                other => self.evaluator.evaluate(&other.to_string()),
            },
            ValueTag::Fixed => {
                let data_type = declared.unwrap_or_else(|| infer_data_type(&value.value));
                render_fixed(&value.value, data_type)
            }
        }
    }

    fn declared_type(&self, key: &str) -> Option<DataType> {
        self.vars
            .lookup(key)
            .map(|v| v.data_type)
            .filter(|t| *t != DataType::Void)
    }
}

fn infer_data_type(value: &Value) -> DataType {
    match value {
        Value::String(_) => DataType::String,
        Value::Number(_) => DataType::Number,
        Value::Bool(_) => DataType::Boolean,
        Value::Object(_) | Value::Array(_) => DataType::Object,
        Value::Null => DataType::Void,
    }
}

/// Literal rendering by declared data type, mirroring the host language's
/// coercion rules for the off-type cases.
fn render_fixed(value: &Value, data_type: DataType) -> String {
    match data_type {
        DataType::String => match value {
            Value::String(s) => format!("\"{}\"", s.escape_default()),
            other => format!("\"{}\"", other.to_string().escape_default()),
        },
        DataType::Number => match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => u8::from(*b).to_string(),
            _ => "undefined".to_string(),
        },
        DataType::Boolean => match value {
            Value::Bool(b) => b.to_string(),
            Value::String(s) => (!s.is_empty()).to_string(),
            Value::Number(n) => (n.as_f64() != Some(0.0)).to_string(),
            _ => "false".to_string(),
        },
        DataType::Object => value.to_string(),
        DataType::Void => "undefined".to_string(),
    }
}

/// Case-label literal: strings quoted, everything else verbatim JSON.
fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.escape_default()),
        other => other.to_string(),
    }
}
