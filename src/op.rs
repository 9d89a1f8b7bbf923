//! Workflow op definitions.

use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of the synthetic op passed to listeners for lifecycle events.
pub const NOOP_KIND: &str = "noop";

/// A single declarative step in a workflow.
///
/// Only `kind` and `outputBinding` are interpreted by the engine; every other
/// field is a kind-specific parameter validated by the matching executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Op {
    /// Operation discriminator (e.g., "format", "parallel", "prompt")
    pub kind: String,

    /// Context key to store the result under (optional)
    #[serde(default, rename = "outputBinding", skip_serializing_if = "Option::is_none")]
    pub output_binding: Option<String>,

    /// Kind-specific parameters
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Op {
    /// Start building an op of the given kind.
    pub fn new(kind: &str) -> OpBuilder {
        OpBuilder::new(kind)
    }

    /// Synthetic op carried by `workflow:start` / `workflow:done` events.
    pub fn noop() -> Self {
        OpBuilder::new(NOOP_KIND).build()
    }

    /// `format` op rendering `template`.
    pub fn format(template: &str) -> OpBuilder {
        OpBuilder::new("format").with_param("template", template)
    }

    /// `join` op reducing the array at `input_key`.
    pub fn join(input_key: &str, separator: &str) -> OpBuilder {
        OpBuilder::new("join")
            .with_param("inputKey", input_key)
            .with_param("separator", separator)
    }

    /// `set` op producing `value`.
    pub fn set<V: Into<Value>>(value: V) -> OpBuilder {
        OpBuilder::new("set").with_param("value", value)
    }

    /// `sequential` group over an isolated copy of the context.
    pub fn sequential(ops: Vec<Op>) -> OpBuilder {
        OpBuilder::new("sequential").ops(ops)
    }

    /// `parallel` group sharing the caller's context.
    pub fn parallel(ops: Vec<Op>) -> OpBuilder {
        OpBuilder::new("parallel").ops(ops)
    }

    /// `map` of `ops` over every element of the array at `input_key`.
    pub fn map(input_key: &str, item_variable: &str, ops: Vec<Op>) -> OpBuilder {
        OpBuilder::new("map")
            .with_param("inputKey", input_key)
            .with_param("itemVariable", item_variable)
            .ops(ops)
    }

    /// `while` loop: repeat `ops` while `condition` is truthy.
    pub fn repeat_while(condition: &str, ops: Vec<Op>) -> OpBuilder {
        OpBuilder::new("while").with_param("condition", condition).ops(ops)
    }

    /// `until` loop: repeat `ops` while `condition` is falsy.
    pub fn repeat_until(condition: &str, ops: Vec<Op>) -> OpBuilder {
        OpBuilder::new("until").with_param("condition", condition).ops(ops)
    }

    /// Raw parameter value.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Optional string parameter; present but non-string is an error.
    pub fn str_param(&self, name: &'static str) -> Result<Option<&str>> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(WorkflowError::invalid(
                &self.kind,
                name,
                format!("expected a string, got {other}"),
            )),
        }
    }

    /// Required string parameter.
    pub fn require_str(&self, name: &'static str) -> Result<&str> {
        self.str_param(name)?
            .ok_or_else(|| WorkflowError::missing(&self.kind, name))
    }

    /// Optional non-negative integer parameter.
    pub fn u64_param(&self, name: &'static str) -> Result<Option<u64>> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                WorkflowError::invalid(&self.kind, name, format!("expected a non-negative integer, got {value}"))
            }),
        }
    }

    /// Inner op list stored under `ops`.
    pub fn ops(&self) -> Result<Vec<Op>> {
        let raw = self
            .params
            .get("ops")
            .ok_or_else(|| WorkflowError::missing(&self.kind, "ops"))?;
        serde_json::from_value(raw.clone())
            .map_err(|e| WorkflowError::invalid(&self.kind, "ops", e.to_string()))
    }
}

/// Builder for creating workflow ops.
#[derive(Debug, Clone)]
pub struct OpBuilder {
    op: Op,
}

impl OpBuilder {
    /// Create a new op builder.
    pub fn new(kind: &str) -> Self {
        Self {
            op: Op {
                kind: kind.to_string(),
                output_binding: None,
                params: Map::new(),
            },
        }
    }

    /// Add a parameter.
    pub fn with_param<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.op.params.insert(key.to_string(), value.into());
        self
    }

    /// Add all parameters from a JSON object.
    pub fn with_params(mut self, params: Value) -> Self {
        if let Value::Object(map) = params {
            self.op.params.extend(map);
        }
        self
    }

    /// Set the inner op list.
    pub fn ops(mut self, ops: Vec<Op>) -> Self {
        let ops = ops.into_iter().map(Op::into_value).collect();
        self.op.params.insert("ops".to_string(), Value::Array(ops));
        self
    }

    /// Set the output binding.
    pub fn output(mut self, name: &str) -> Self {
        self.op.output_binding = Some(name.to_string());
        self
    }

    /// Build the op.
    pub fn build(self) -> Op {
        self.op
    }
}

impl From<OpBuilder> for Op {
    fn from(builder: OpBuilder) -> Self {
        builder.build()
    }
}

impl Op {
    fn into_value(self) -> Value {
        let mut map = self.params;
        map.insert("kind".to_string(), Value::String(self.kind));
        if let Some(binding) = self.output_binding {
            map.insert("outputBinding".to_string(), Value::String(binding));
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_op_builder() {
        let op = Op::format("Hello {{name}}").output("greeting").build();

        assert_eq!(op.kind, "format");
        assert_eq!(op.require_str("template").unwrap(), "Hello {{name}}");
        assert_eq!(op.output_binding, Some("greeting".to_string()));
    }

    #[test]
    fn test_deserialize_flattened_params() {
        let op: Op = serde_json::from_value(json!({
            "kind": "join",
            "outputBinding": "joined",
            "inputKey": "parts",
            "separator": ","
        }))
        .unwrap();

        assert_eq!(op.kind, "join");
        assert_eq!(op.output_binding.as_deref(), Some("joined"));
        assert_eq!(op.param("inputKey"), Some(&json!("parts")));
        assert!(op.param("kind").is_none());
    }

    #[test]
    fn test_nested_ops_round_trip() {
        let inner = Op::format("{{item}}").output("x").build();
        let op = Op::map("items", "item", vec![inner.clone()]).build();

        assert_eq!(op.ops().unwrap(), vec![inner]);
    }

    #[test]
    fn test_missing_and_invalid_params() {
        let op = Op::new("format").with_param("template", 5).build();

        assert!(matches!(
            op.require_str("template"),
            Err(WorkflowError::InvalidParam { param: "template", .. })
        ));
        assert!(matches!(
            op.require_str("other"),
            Err(WorkflowError::MissingParam { param: "other", .. })
        ));
        assert!(matches!(op.ops(), Err(WorkflowError::MissingParam { param: "ops", .. })));
    }

    #[test]
    fn test_u64_param() {
        let op = Op::new("parallel").with_param("concurrency", 3).build();
        assert_eq!(op.u64_param("concurrency").unwrap(), Some(3));
        assert_eq!(op.u64_param("absent").unwrap(), None);

        let bad = Op::new("parallel").with_param("concurrency", -1).build();
        assert!(bad.u64_param("concurrency").is_err());
    }
}
