//! Workflow definition and builder.

use crate::context::Context;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::op::{Op, OpBuilder};
use crate::runner::{Runner, StepResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, ordered list of ops.
///
/// A workflow is never mutated by running it; every run gets its own context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow name
    pub name: String,

    /// Description of what this workflow does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ops to execute
    #[serde(default)]
    pub ops: Vec<Op>,
}

/// Result of workflow execution.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Final result (last dispatch's output)
    pub result: Value,

    /// Every dispatch of the run, in order
    pub step_results: Vec<StepResult>,

    /// Final context state
    pub context: Context,

    /// Total execution time in milliseconds
    pub total_ms: f64,
}

impl Workflow {
    /// Create a new workflow with a name.
    pub fn new(name: &str) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    /// Create an empty workflow.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            ops: Vec::new(),
        }
    }

    /// Step-by-step runner over this workflow, starting from `context`.
    pub fn runner(&self, interpreter: &Interpreter, context: Context) -> Runner {
        interpreter.runner(&self.name, self.ops.clone(), context)
    }

    /// Run every op and return the final context.
    ///
    /// With no ops the initial context comes back untouched.
    pub async fn run(&self, interpreter: &Interpreter, context: Context) -> Result<Context> {
        self.runner(interpreter, context).finish().await
    }

    /// Run every op, keeping each dispatch's result.
    pub async fn execute(&self, interpreter: &Interpreter, context: Context) -> Result<ExecutionResult> {
        let mut runner = self.runner(interpreter, context);
        let mut step_results = Vec::new();

        while let Some(step) = runner.next().await {
            step_results.push(step?);
        }

        Ok(ExecutionResult {
            result: step_results.last().map(|step| step.result.clone()).unwrap_or(Value::Null),
            step_results,
            total_ms: runner.elapsed_ms(),
            context: runner.context().clone(),
        })
    }
}

/// Builder for creating workflows.
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    /// Create a new workflow builder.
    pub fn new(name: &str) -> Self {
        Self {
            workflow: Workflow::empty(name),
        }
    }

    /// Set the workflow description.
    pub fn description(mut self, desc: &str) -> Self {
        self.workflow.description = Some(desc.to_string());
        self
    }

    /// Add an op to the workflow.
    pub fn add<O: Into<Op>>(mut self, op: O) -> Self {
        self.workflow.ops.push(op.into());
        self
    }

    /// Add an op builder (convenience).
    pub fn op(self, op: OpBuilder) -> Self {
        self.add(op.build())
    }

    /// Build the workflow.
    pub fn build(self) -> Workflow {
        self.workflow
    }

    /// Execute the workflow.
    pub async fn run(self, interpreter: &Interpreter, context: Context) -> Result<Context> {
        self.build().run(interpreter, context).await
    }
}

impl From<WorkflowBuilder> for Workflow {
    fn from(builder: WorkflowBuilder) -> Self {
        builder.build()
    }
}
