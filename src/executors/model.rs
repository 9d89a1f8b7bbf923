//! Executors backed by the injected language model.

use crate::context::Context;
use crate::error::{Result, WorkflowError};
use crate::interpreter::Interpreter;
use crate::llm::LanguageModel;
use crate::op::Op;
use crate::registry::OpRunner;
use crate::template::resolve;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// `prompt`: send the resolved `prompt` template under `persona`, return the reply text.
pub struct Prompt {
    model: Arc<dyn LanguageModel>,
}

impl Prompt {
    /// `prompt` executor backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl OpRunner for Prompt {
    async fn execute(&self, op: &Op, context: &Context, interpreter: &Interpreter) -> Result<Value> {
        let persona = persona(op, context, interpreter)?;
        let text = resolve(op.require_str("prompt")?, context);

        tracing::debug!(persona_len = persona.len(), prompt_len = text.len(), "Prompting model");
        let reply = abortable(interpreter, self.model.prompt(&persona, &text)).await?;
        Ok(Value::String(reply))
    }
}

/// `promptForJson`: like `prompt`, constrained to `schema`; returns the parsed value.
pub struct PromptForJson {
    model: Arc<dyn LanguageModel>,
}

impl PromptForJson {
    /// `promptForJson` executor backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl OpRunner for PromptForJson {
    async fn execute(&self, op: &Op, context: &Context, interpreter: &Interpreter) -> Result<Value> {
        let persona = persona(op, context, interpreter)?;
        let text = resolve(op.require_str("prompt")?, context);
        let schema = op
            .param("schema")
            .ok_or_else(|| WorkflowError::missing(&op.kind, "schema"))?;

        abortable(interpreter, self.model.prompt_for_json(&persona, &text, schema)).await
    }
}

fn persona(op: &Op, context: &Context, interpreter: &Interpreter) -> Result<String> {
    Ok(match op.str_param("persona")? {
        Some(persona) => resolve(persona, context),
        None => interpreter.config().default_persona.clone(),
    })
}

/// Race a model call against the run's abort signal.
async fn abortable<T, F>(interpreter: &Interpreter, call: F) -> Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        biased;
        _ = interpreter.cancellation().signal().cancelled() => Err(WorkflowError::Cancelled),
        reply = call => Ok(reply?),
    }
}
