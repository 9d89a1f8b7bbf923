//! JSON parsing executors.

use super::input_text;
use crate::context::Context;
use crate::error::Result;
use crate::extract::extract_json;
use crate::interpreter::Interpreter;
use crate::op::Op;
use crate::registry::OpRunner;
use async_trait::async_trait;
use serde_json::Value;

/// `extractJson`: every JSON object/array embedded in the input text.
///
/// Malformed fragments are skipped; text without JSON yields `[]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractJson;

#[async_trait]
impl OpRunner for ExtractJson {
    async fn execute(&self, op: &Op, context: &Context, _interpreter: &Interpreter) -> Result<Value> {
        let text = input_text(op, context)?;
        Ok(Value::Array(extract_json(&text)))
    }
}

/// `parseJSON`: strict parse of the input text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseJson;

#[async_trait]
impl OpRunner for ParseJson {
    async fn execute(&self, op: &Op, context: &Context, _interpreter: &Interpreter) -> Result<Value> {
        let text = input_text(op, context)?;
        Ok(serde_json::from_str(text.trim())?)
    }
}
