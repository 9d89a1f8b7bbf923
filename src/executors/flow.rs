//! Composition executors: `sequential`, `parallel`, `map`.

use super::input_array;
use crate::context::{Context, OUTPUT_KEY};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::op::Op;
use crate::registry::OpRunner;
use crate::scheduler::run_bounded;
use async_trait::async_trait;
use serde_json::Value;

/// `sequential`: run `ops` in order against an isolated copy of the context.
///
/// Bindings made by inner ops are visible to later inner ops only; the
/// caller's context sees nothing but the returned list of results.
///
/// The list holds one entry per dispatch, not per declared op: a `while` or
/// `until` inside the group contributes one entry for every body op it runs
/// (none if the body never runs). `parallel` instead reduces a loop branch to
/// its last result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

#[async_trait]
impl OpRunner for Sequential {
    async fn execute(&self, op: &Op, context: &Context, interpreter: &Interpreter) -> Result<Value> {
        let ops = op.ops()?;
        let isolated = context.deep_copy();
        let results = interpreter.run_ops(ops, &isolated).await?;
        Ok(Value::Array(results))
    }
}

/// `parallel`: run `ops` concurrently against the caller's context.
///
/// Every branch sees the same context, so concurrent writes to one key are
/// last-write-wins. Results come back in declared order. The first failing
/// branch fails the group. `concurrency` caps in-flight branches; without it
/// the engine-wide `parallel_concurrency` applies, and without that every
/// branch starts at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parallel;

#[async_trait]
impl OpRunner for Parallel {
    async fn execute(&self, op: &Op, context: &Context, interpreter: &Interpreter) -> Result<Value> {
        let ops = op.ops()?;
        let cap = match op.u64_param("concurrency")? {
            Some(cap) => cap as usize,
            None => interpreter.config().parallel_concurrency.unwrap_or(ops.len()),
        };

        let tasks: Vec<_> = ops
            .iter()
            .map(|inner| move || interpreter.dispatch(inner, context))
            .collect();

        let results = run_bounded(tasks, cap, interpreter.cancellation(), |progress| {
            tracing::debug!(%progress, "Parallel branch settled");
        })
        .await?;

        Ok(Value::Array(results))
    }
}

/// `map`: run `ops` once per element of the array at `inputKey`.
///
/// Each element gets its own copy of the context with the element bound to
/// `itemVariable` (default `item`); the element's result is that run's final
/// `_output`. Elements are processed strictly one after another.
#[derive(Debug, Clone, Copy, Default)]
pub struct Map;

#[async_trait]
impl OpRunner for Map {
    async fn execute(&self, op: &Op, context: &Context, interpreter: &Interpreter) -> Result<Value> {
        let items = input_array(op, context)?;
        let item_variable = op.str_param("itemVariable")?.unwrap_or("item");
        let ops = op.ops()?;

        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            interpreter.cancellation().check()?;
            tracing::trace!(index, "Mapping element");

            let scope = context.derive(item_variable, item);
            scope.remove(OUTPUT_KEY);
            interpreter.run_ops(ops.clone(), &scope).await?;
            results.push(scope.output().unwrap_or(Value::Null));
        }

        Ok(Value::Array(results))
    }
}
