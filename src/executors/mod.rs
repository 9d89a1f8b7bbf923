//! Built-in executor library.

mod fetch;
mod flow;
mod json;
mod model;
mod text;

pub use fetch::Fetch;
pub use flow::{Map, Parallel, Sequential};
pub use json::{ExtractJson, ParseJson};
pub use model::{Prompt, PromptForJson};
pub use text::{join_values, Format, Join, Set};

use crate::context::Context;
use crate::error::{Result, WorkflowError};
use crate::llm::LanguageModel;
use crate::op::Op;
use crate::registry::Registry;
use crate::template;
use serde_json::Value;
use std::sync::Arc;

/// Register every built-in kind. Model-backed kinds need `model`.
pub(crate) fn register_builtins(registry: &mut Registry, model: Option<Arc<dyn LanguageModel>>) {
    registry.register("format", Format);
    registry.register("join", Join);
    registry.register("set", Set);
    registry.register("sequential", Sequential);
    registry.register("parallel", Parallel);
    registry.register("map", Map);
    registry.register("extractJson", ExtractJson);
    registry.register("parseJSON", ParseJson);
    registry.register("fetch", Fetch::new());

    if let Some(model) = model {
        registry.register("prompt", Prompt::new(model.clone()));
        registry.register("promptForJson", PromptForJson::new(model));
    }
}

/// Array bound at `inputKey`.
fn input_array(op: &Op, context: &Context) -> Result<Vec<Value>> {
    let key = op.require_str("inputKey")?;
    match context.lookup(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(WorkflowError::invalid(
            &op.kind,
            "inputKey",
            format!("'{key}' holds {other}, not an array"),
        )),
        None => Err(WorkflowError::invalid(&op.kind, "inputKey", format!("'{key}' is not bound"))),
    }
}

/// Text from the value at `inputKey`, or the resolved `text` template.
fn input_text(op: &Op, context: &Context) -> Result<String> {
    if let Some(key) = op.str_param("inputKey")? {
        return match context.lookup(key) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Ok(other.to_string()),
            None => Err(WorkflowError::invalid(&op.kind, "inputKey", format!("'{key}' is not bound"))),
        };
    }
    match op.str_param("text")? {
        Some(text) => Ok(template::resolve(text, context)),
        None => Err(WorkflowError::missing(&op.kind, "inputKey")),
    }
}
