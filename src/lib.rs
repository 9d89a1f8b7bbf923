//! # opflow
//!
//! Interpreter for declarative workflow graphs.
//!
//! A [`Workflow`] is an ordered list of [`Op`]s run against a shared
//! [`Context`]. Ops are dispatched by kind through an open [`Registry`] of
//! executors: built-ins cover templating, sequencing, fan-out, mapping and
//! model calls, and hosts register their own kinds alongside them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opflow::{Context, Interpreter, Op, Workflow};
//!
//! # async fn demo() -> opflow::Result<()> {
//! let workflow = Workflow::new("greet")
//!     .add(Op::format("Hello {{user.name}}").output("greeting"))
//!     .add(Op::map("items", "item", vec![Op::format("- {{item}}").build()]).output("lines"))
//!     .add(Op::join("lines", "\n").output("body"))
//!     .build();
//!
//! let context = Context::new()
//!     .with("user", serde_json::json!({"name": "Ada"}))
//!     .with("items", serde_json::json!(["tea", "cake"]));
//!
//! let context = workflow.run(&Interpreter::default(), context).await?;
//! println!("{}", context.get("body").unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! ## YAML Definition
//!
//! ```yaml
//! name: greet
//! ops:
//!   - kind: format
//!     template: "Hello {{user.name}}"
//!     outputBinding: greeting
//!   - kind: parallel
//!     concurrency: 2
//!     ops:
//!       - kind: prompt
//!         prompt: "Write a haiku about {{greeting}}"
//!       - kind: fetch
//!         url: "https://example.com/users/{{user.id}}"
//! ```

mod cancel;
mod config;
mod context;
pub mod definition;
mod error;
pub mod executors;
mod extract;
mod interpreter;
mod listener;
mod llm;
mod op;
mod registry;
mod runner;
pub mod scheduler;
pub mod template;
mod workflow;

pub use cancel::Cancellation;
pub use config::EngineConfig;
pub use context::{is_truthy, Context, OUTPUT_KEY};
pub use definition::{parse_json, parse_yaml};
pub use error::{Result, WorkflowError};
pub use extract::extract_json;
pub use interpreter::{Interpreter, InterpreterBuilder};
pub use listener::{Listener, NoopListener, Stage, TracingListener};
pub use llm::LanguageModel;
pub use op::{Op, OpBuilder, NOOP_KIND};
pub use registry::{FnRunner, OpRunner, Registry};
pub use runner::{Runner, StepResult};
pub use scheduler::{run_bounded, Progress};
pub use workflow::{ExecutionResult, Workflow, WorkflowBuilder};

/// Re-export common types
pub use serde_json::Value;
