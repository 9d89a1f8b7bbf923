//! Text-producing executors.

use super::input_array;
use crate::context::Context;
use crate::error::{Result, WorkflowError};
use crate::interpreter::Interpreter;
use crate::op::Op;
use crate::registry::OpRunner;
use crate::template::{resolve, resolve_value};
use async_trait::async_trait;
use serde_json::Value;

/// `format`: resolve `template` against the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Format;

#[async_trait]
impl OpRunner for Format {
    async fn execute(&self, op: &Op, context: &Context, _interpreter: &Interpreter) -> Result<Value> {
        Ok(Value::String(resolve(op.require_str("template")?, context)))
    }
}

/// `join`: concatenate an array with `separator` (default "").
///
/// Reads the array at `inputKey`, or falls back to an inline `items` array
/// whose string entries are template-resolved. An empty array joins to "".
#[derive(Debug, Clone, Copy, Default)]
pub struct Join;

#[async_trait]
impl OpRunner for Join {
    async fn execute(&self, op: &Op, context: &Context, _interpreter: &Interpreter) -> Result<Value> {
        let separator = op.str_param("separator")?.unwrap_or("");

        let items = if op.param("inputKey").is_some() {
            input_array(op, context)?
        } else {
            match op.param("items") {
                Some(Value::Array(items)) => items.iter().map(|item| resolve_value(item, context)).collect(),
                Some(other) => {
                    return Err(WorkflowError::invalid(&op.kind, "items", format!("expected an array, got {other}")))
                }
                None => return Err(WorkflowError::missing(&op.kind, "inputKey")),
            }
        };

        Ok(Value::String(join_values(&items, separator)))
    }
}

/// Join values as text; non-strings are written as compact JSON.
pub fn join_values(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// `set`: produce `value`, with placeholders in its strings resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct Set;

#[async_trait]
impl OpRunner for Set {
    async fn execute(&self, op: &Op, context: &Context, _interpreter: &Interpreter) -> Result<Value> {
        let value = op
            .param("value")
            .ok_or_else(|| WorkflowError::missing(&op.kind, "value"))?;
        Ok(resolve_value(value, context))
    }
}
