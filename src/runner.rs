//! Step-by-step execution of an op list.
//!
//! [`Runner`] is an explicit state machine: each call to [`Runner::next`]
//! advances until one op has been dispatched and yields its result. Loop
//! kinds (`while`, `until`) never reach an executor; the runner pushes their
//! body as a new frame and re-checks the condition each time the body is
//! exhausted.

use crate::context::Context;
use crate::error::{Result, WorkflowError};
use crate::interpreter::Interpreter;
use crate::listener::Stage;
use crate::op::Op;
use futures::Stream;
use serde_json::Value;
use std::time::Instant;

/// Result of a single op dispatch.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Dispatch index within the run (0-based)
    pub index: usize,

    /// Op that was dispatched
    pub op: Op,

    /// Result of the op
    pub result: Value,

    /// Context after the result was merged
    pub context: Context,

    /// Execution time in milliseconds
    pub duration_ms: f64,
}

/// Loop flavor of a `while`/`until` op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopMode {
    While,
    Until,
}

impl LoopMode {
    pub(crate) fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "while" => Some(Self::While),
            "until" => Some(Self::Until),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::While => "while",
            Self::Until => "until",
        }
    }

    /// `while` runs on a truthy condition, `until` on a falsy one.
    fn should_run(&self, condition: bool) -> bool {
        match self {
            Self::While => condition,
            Self::Until => !condition,
        }
    }
}

#[derive(Debug)]
struct Repeat {
    mode: LoopMode,
    condition: String,
    limit: Option<u64>,
    iterations: u64,
}

impl Repeat {
    /// Check the condition before an iteration; true when the body should run.
    fn begin_iteration(&mut self, context: &Context) -> Result<bool> {
        if !self.mode.should_run(context.is_truthy(&self.condition)) {
            tracing::debug!(
                kind = self.mode.as_str(),
                condition = %self.condition,
                iterations = self.iterations,
                "Loop finished"
            );
            return Ok(false);
        }
        if let Some(limit) = self.limit {
            if self.iterations >= limit {
                return Err(WorkflowError::LoopLimit {
                    kind: self.mode.as_str().to_string(),
                    condition: self.condition.clone(),
                    limit,
                });
            }
        }
        self.iterations += 1;
        Ok(true)
    }
}

#[derive(Debug)]
struct Frame {
    ops: Vec<Op>,
    cursor: usize,
    repeat: Option<Repeat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Running,
    Finished,
}

/// In-progress run of an op list.
///
/// Drive it with [`next`](Self::next) (or [`into_stream`](Self::into_stream))
/// until it returns `None`; dropping it early abandons the run. After an error
/// the runner is finished.
#[derive(Debug)]
pub struct Runner {
    interpreter: Interpreter,
    name: Option<String>,
    context: Context,
    stack: Vec<Frame>,
    phase: Phase,
    dispatched: usize,
    started: Option<Instant>,
}

impl Runner {
    /// Top-level run: emits `workflow:start` and `workflow:done`.
    pub(crate) fn top_level(interpreter: Interpreter, name: &str, ops: Vec<Op>, context: Context) -> Self {
        Self::build(interpreter, Some(name.to_string()), ops, context)
    }

    /// Nested run inside a composite op: no workflow lifecycle events.
    pub(crate) fn nested(interpreter: Interpreter, ops: Vec<Op>, context: Context) -> Self {
        Self::build(interpreter, None, ops, context)
    }

    fn build(interpreter: Interpreter, name: Option<String>, ops: Vec<Op>, context: Context) -> Self {
        Self {
            interpreter,
            name,
            context,
            stack: vec![Frame {
                ops,
                cursor: 0,
                repeat: None,
            }],
            phase: Phase::Pending,
            dispatched: 0,
            started: None,
        }
    }

    /// The context this run mutates.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Whether the run has completed or failed.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Dispatch the next op and return its result, or `None` once the run is over.
    pub async fn next(&mut self) -> Option<Result<StepResult>> {
        match self.phase {
            Phase::Finished => return None,
            Phase::Pending => {
                self.phase = Phase::Running;
                self.started = Some(Instant::now());
                if let Some(name) = &self.name {
                    tracing::info!(workflow = %name, ops = self.stack[0].ops.len(), "Starting workflow");
                    self.interpreter.notify(Stage::WorkflowStart, &Op::noop(), &self.context);
                }
            }
            Phase::Running => {}
        }

        match self.advance().await {
            Ok(Some(step)) => Some(Ok(step)),
            Ok(None) => {
                self.phase = Phase::Finished;
                if let Some(name) = &self.name {
                    self.interpreter.notify(Stage::WorkflowDone, &Op::noop(), &self.context);
                    tracing::info!(
                        workflow = %name,
                        dispatched = self.dispatched,
                        total_ms = self.elapsed_ms(),
                        "Workflow completed"
                    );
                }
                None
            }
            Err(err) => {
                self.phase = Phase::Finished;
                if let Some(name) = &self.name {
                    tracing::warn!(workflow = %name, error = %err, "Workflow aborted");
                }
                Some(Err(err))
            }
        }
    }

    /// Drive the run to completion and return the final context.
    pub async fn finish(mut self) -> Result<Context> {
        while let Some(step) = self.next().await {
            step?;
        }
        Ok(self.context)
    }

    /// Adapt the runner into a stream of dispatch results.
    pub fn into_stream(self) -> impl Stream<Item = Result<StepResult>> + Send {
        futures::stream::unfold(self, |mut runner| async move {
            let item = runner.next().await?;
            Some((item, runner))
        })
    }

    pub(crate) fn elapsed_ms(&self) -> f64 {
        self.started
            .map(|started| started.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or_default()
    }

    async fn advance(&mut self) -> Result<Option<StepResult>> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };

            let Some(op) = frame.ops.get(frame.cursor).cloned() else {
                let again = match frame.repeat.as_mut() {
                    Some(repeat) => repeat.begin_iteration(&self.context)?,
                    None => false,
                };
                if again {
                    frame.cursor = 0;
                } else {
                    self.stack.pop();
                }
                continue;
            };
            frame.cursor += 1;

            self.interpreter.cancellation().check()?;

            if let Some(mode) = LoopMode::from_kind(&op.kind) {
                self.enter_loop(mode, &op)?;
                continue;
            }

            let started = Instant::now();
            let result = self.interpreter.exec_op(&op, &self.context).await?;
            let index = self.dispatched;
            self.dispatched += 1;

            return Ok(Some(StepResult {
                index,
                op,
                result,
                context: self.context.clone(),
                duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            }));
        }
    }

    fn enter_loop(&mut self, mode: LoopMode, op: &Op) -> Result<()> {
        let body = op.ops()?;
        let limit = op
            .u64_param("maxIterations")?
            .or(self.interpreter.config().max_loop_iterations);
        let mut repeat = Repeat {
            mode,
            condition: op.require_str("condition")?.to_string(),
            limit,
            iterations: 0,
        };

        if body.is_empty() {
            tracing::warn!(kind = mode.as_str(), condition = %repeat.condition, "Skipping loop with empty body");
            return Ok(());
        }

        if repeat.begin_iteration(&self.context)? {
            self.stack.push(Frame {
                ops: body,
                cursor: 0,
                repeat: Some(repeat),
            });
        }
        Ok(())
    }
}
