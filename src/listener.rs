//! Run progress events.

use crate::context::Context;
use crate::op::Op;
use std::fmt;

/// Lifecycle stage reported to a [`Listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Before the first op of a top-level run
    WorkflowStart,
    /// Before an op is dispatched
    OpPre,
    /// After an op's result has been merged into the context
    OpPost,
    /// After the last op of a top-level run
    WorkflowDone,
}

impl Stage {
    /// Wire name of the stage (`workflow:start`, `op:pre`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::WorkflowStart => "workflow:start",
            Stage::OpPre => "op:pre",
            Stage::OpPost => "op:post",
            Stage::WorkflowDone => "workflow:done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer of run progress.
///
/// Receives the op being dispatched (a synthetic no-op for workflow-level
/// stages) and the live context at that instant. Called inline on the run's
/// task, so implementations should return quickly.
pub trait Listener: Send + Sync {
    /// Handle one lifecycle event.
    fn on_event(&self, stage: Stage, op: &Op, context: &Context);
}

impl<F> Listener for F
where
    F: Fn(Stage, &Op, &Context) + Send + Sync,
{
    fn on_event(&self, stage: Stage, op: &Op, context: &Context) {
        self(stage, op, context)
    }
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl Listener for NoopListener {
    fn on_event(&self, _stage: Stage, _op: &Op, _context: &Context) {}
}

/// Listener that logs each stage through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl Listener for TracingListener {
    fn on_event(&self, stage: Stage, op: &Op, context: &Context) {
        match stage {
            Stage::WorkflowStart | Stage::WorkflowDone => {
                tracing::info!(stage = %stage, keys = context.len(), "Workflow event");
            }
            Stage::OpPre | Stage::OpPost => {
                tracing::debug!(
                    stage = %stage,
                    kind = %op.kind,
                    binding = op.output_binding.as_deref().unwrap_or("-"),
                    "Op event"
                );
            }
        }
    }
}
