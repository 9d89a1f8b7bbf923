//! Op dispatch.

use crate::cancel::Cancellation;
use crate::config::EngineConfig;
use crate::context::{Context, OUTPUT_KEY};
use crate::error::{Result, WorkflowError};
use crate::listener::{Listener, Stage, TracingListener};
use crate::llm::LanguageModel;
use crate::op::Op;
use crate::registry::{OpRunner, Registry};
use crate::runner::{LoopMode, Runner};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Dispatches ops against an executor registry.
///
/// Cheap to clone; every clone shares the registry, listener, cancellation
/// and config.
#[derive(Clone)]
pub struct Interpreter {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    listener: Arc<dyn Listener>,
    cancellation: Cancellation,
    config: EngineConfig,
}

impl Interpreter {
    /// Start building an interpreter.
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::default()
    }

    /// Registry in effect for this interpreter.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Cancellation polled between work units.
    pub fn cancellation(&self) -> &Cancellation {
        &self.inner.cancellation
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Dispatch a single op.
    ///
    /// Emits `op:pre`, runs the op's executor, stores the result under the
    /// op's `outputBinding` (if any) and under `_output`, then emits `op:post`.
    /// An unregistered kind fails immediately.
    pub async fn exec_op(&self, op: &Op, context: &Context) -> Result<Value> {
        let listener = &self.inner.listener;
        listener.on_event(Stage::OpPre, op, context);

        let runner = self
            .inner
            .registry
            .get(&op.kind)
            .ok_or_else(|| WorkflowError::UnknownKind(op.kind.clone()))?;

        tracing::debug!(kind = %op.kind, binding = ?op.output_binding, "Dispatching op");

        let result = runner
            .execute(op, context, self)
            .await
            .inspect_err(|err| tracing::warn!(kind = %op.kind, error = %err, "Op failed"))?;

        if let Some(binding) = &op.output_binding {
            context.set(binding.clone(), result.clone());
        }
        context.set(OUTPUT_KEY, result.clone());

        listener.on_event(Stage::OpPost, op, context);
        Ok(result)
    }

    /// Dispatch an op that may also be a `while`/`until` loop.
    ///
    /// Loops run as a nested runner and yield their last body result, or
    /// `null` when the body never ran.
    pub async fn dispatch(&self, op: &Op, context: &Context) -> Result<Value> {
        if LoopMode::from_kind(&op.kind).is_some() {
            let results = self.run_ops(vec![op.clone()], context).await?;
            return Ok(results.into_iter().last().unwrap_or(Value::Null));
        }
        self.exec_op(op, context).await
    }

    /// Run an op list in order against `context`, returning each dispatch's result.
    pub async fn run_ops(&self, ops: Vec<Op>, context: &Context) -> Result<Vec<Value>> {
        let mut runner = Runner::nested(self.clone(), ops, context.clone());
        let mut results = Vec::new();
        while let Some(step) = runner.next().await {
            results.push(step?.result);
        }
        Ok(results)
    }

    /// Top-level runner over `ops`, emitting workflow lifecycle events.
    pub fn runner(&self, name: &str, ops: Vec<Op>, context: Context) -> Runner {
        Runner::top_level(self.clone(), name, ops, context)
    }

    pub(crate) fn notify(&self, stage: Stage, op: &Op, context: &Context) {
        self.inner.listener.on_event(stage, op, context);
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("registry", &self.inner.registry)
            .field("cancellation", &self.inner.cancellation)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Builder for [`Interpreter`].
///
/// The final registry is the built-in library overlaid with every executor
/// handed to the builder; caller-supplied executors win on collision.
#[derive(Default)]
pub struct InterpreterBuilder {
    executors: Registry,
    listener: Option<Arc<dyn Listener>>,
    cancellation: Cancellation,
    config: EngineConfig,
    model: Option<Arc<dyn LanguageModel>>,
}

impl InterpreterBuilder {
    /// Model used by the `prompt` and `promptForJson` executors.
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Add one caller-supplied executor.
    pub fn executor<R: OpRunner + 'static>(mut self, kind: &str, runner: R) -> Self {
        self.executors.register(kind, runner);
        self
    }

    /// Add an async closure as a caller-supplied executor.
    pub fn executor_fn<F, Fut>(mut self, kind: &str, f: F) -> Self
    where
        F: Fn(Op, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.executors.register_fn(kind, f);
        self
    }

    /// Add every executor in `registry`.
    pub fn executors(mut self, registry: Registry) -> Self {
        self.executors.merge(registry);
        self
    }

    /// Observer for run progress. Defaults to [`TracingListener`].
    pub fn listener<L: Listener + 'static>(mut self, listener: L) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Cancellation shared by every run of the interpreter.
    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the interpreter.
    pub fn build(self) -> Interpreter {
        let mut registry = Registry::builtin(self.model);
        registry.merge(self.executors);

        Interpreter {
            inner: Arc::new(Inner {
                registry,
                listener: self.listener.unwrap_or_else(|| Arc::new(TracingListener)),
                cancellation: self.cancellation,
                config: self.config,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[tokio::test]
    async fn test_exec_op_binds_result_and_output() {
        let interpreter = Interpreter::default();
        let ctx = Context::new().with("name", "Ada");

        let result = interpreter
            .exec_op(&Op::format("Hi {{name}}").output("greeting").build(), &ctx)
            .await
            .unwrap();

        assert_eq!(result, json!("Hi Ada"));
        assert_eq!(ctx.get("greeting"), Some(json!("Hi Ada")));
        assert_eq!(ctx.output(), Some(json!("Hi Ada")));
    }

    #[tokio::test]
    async fn test_exec_op_without_binding_sets_output_only() {
        let interpreter = Interpreter::default();
        let ctx = Context::new();

        interpreter.exec_op(&Op::set("v").build(), &ctx).await.unwrap();

        assert_eq!(ctx.keys(), vec![OUTPUT_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_fatal() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let interpreter = Interpreter::builder()
            .listener({
                let events = events.clone();
                move |stage: Stage, _op: &Op, _ctx: &Context| events.lock().push(stage)
            })
            .build();
        let ctx = Context::new();

        let err = interpreter
            .exec_op(&Op::new("teleport").output("x").build(), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::UnknownKind(ref kind) if kind == "teleport"));
        assert!(ctx.is_empty());
        assert_eq!(*events.lock(), vec![Stage::OpPre]);
    }

    #[tokio::test]
    async fn test_executor_error_leaves_context_untouched() {
        let interpreter = Interpreter::builder()
            .executor_fn("explode", |_op, _ctx| async {
                Err(WorkflowError::Other(anyhow::anyhow!("kaboom")))
            })
            .build();
        let ctx = Context::new();

        let err = interpreter
            .exec_op(&Op::new("explode").output("x").build(), &ctx)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "kaboom");
        assert!(!ctx.contains_key("x"));
        assert!(ctx.output().is_none());
    }

    #[tokio::test]
    async fn test_dispatch_runs_loops() {
        let interpreter = Interpreter::builder()
            .executor_fn("countdown", |_op, ctx| async move {
                let left = ctx.get("left").and_then(|v| v.as_i64()).unwrap_or(0) - 1;
                ctx.set("left", json!(left));
                Ok(json!(left))
            })
            .build();
        let ctx = Context::new().with("left", 3);

        let op = Op::repeat_while("left", vec![Op::new("countdown").build()]).build();
        let result = interpreter.dispatch(&op, &ctx).await.unwrap();

        assert_eq!(result, json!(0));
        assert_eq!(ctx.get("left"), Some(json!(0)));
    }
}
