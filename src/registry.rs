//! Executor registry.
//!
//! Op kinds are an open set: the registry maps a kind string to an
//! [`OpRunner`], and hosts add their own kinds next to the built-ins.
//!
//! # Example
//!
//! ```rust,ignore
//! use opflow::{Registry, Value};
//!
//! let mut registry = Registry::new();
//! registry.register_fn("rescan", |op, ctx| async move {
//!     let source = ctx.get("source").unwrap_or_default();
//!     Ok(Value::String(format!("rescanned {source}")))
//! });
//! ```

use crate::context::Context;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::llm::LanguageModel;
use crate::op::Op;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Implementation of one op kind.
///
/// Executors fail only for exceptional conditions; any error aborts the
/// enclosing dispatch. Composite kinds use `interpreter` to dispatch their
/// inner ops.
#[async_trait]
pub trait OpRunner: Send + Sync {
    /// Run `op` against `context` and return its result.
    async fn execute(&self, op: &Op, context: &Context, interpreter: &Interpreter) -> Result<Value>;
}

/// Adapter turning an async closure over an owned op and context handle into an [`OpRunner`].
pub struct FnRunner<F> {
    f: F,
}

impl<F> FnRunner<F> {
    /// Wrap `f` as an executor.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> OpRunner for FnRunner<F>
where
    F: Fn(Op, Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn execute(&self, op: &Op, context: &Context, _interpreter: &Interpreter) -> Result<Value> {
        (self.f)(op.clone(), context.clone()).await
    }
}

/// Map from op kind to executor.
#[derive(Clone, Default)]
pub struct Registry {
    runners: HashMap<String, Arc<dyn OpRunner>>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in executor library.
    ///
    /// `prompt` and `promptForJson` are only present when a model is supplied.
    pub fn builtin(model: Option<Arc<dyn LanguageModel>>) -> Self {
        let mut registry = Self::new();
        crate::executors::register_builtins(&mut registry, model);
        registry
    }

    /// Register an executor. Replaces any executor already bound to `kind`.
    pub fn register<R: OpRunner + 'static>(&mut self, kind: impl Into<String>, runner: R) {
        self.runners.insert(kind.into(), Arc::new(runner));
    }

    /// Register an async closure as an executor.
    pub fn register_fn<F, Fut>(&mut self, kind: impl Into<String>, f: F)
    where
        F: Fn(Op, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register(kind, FnRunner::new(f));
    }

    /// Overlay `other` onto this registry; on a kind collision `other` wins.
    pub fn merge(&mut self, other: Registry) {
        self.runners.extend(other.runners);
    }

    /// Get an executor by kind.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn OpRunner>> {
        self.runners.get(kind).cloned()
    }

    /// Check if a kind is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.runners.contains_key(kind)
    }

    /// All registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.runners.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Get the number of registered executors.
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("kinds", &self.kinds()).finish()
    }
}
