//! Workflow definition loading.
//!
//! Definitions are usually produced by an external builder and stored as
//! YAML or JSON. Loading validates structure only; kind-specific parameters
//! are checked by executors at run time.

use crate::op::Op;
use crate::Workflow;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a workflow from YAML string.
///
/// # Example
///
/// ```rust
/// use opflow::parse_yaml;
///
/// let yaml = r#"
/// name: greet
/// ops:
///   - kind: format
///     template: "Hello {{name}}"
///     outputBinding: greeting
/// "#;
///
/// let workflow = parse_yaml(yaml).unwrap();
/// assert_eq!(workflow.name, "greet");
/// assert_eq!(workflow.ops.len(), 1);
/// ```
pub fn parse_yaml(yaml: &str) -> Result<Workflow> {
    let workflow: Workflow = serde_yaml::from_str(yaml).context("Failed to parse workflow YAML")?;

    validate(&workflow)?;

    Ok(workflow)
}

/// Parse a workflow from a JSON string.
pub fn parse_json(json: &str) -> Result<Workflow> {
    let workflow: Workflow = serde_json::from_str(json).context("Failed to parse workflow JSON")?;

    validate(&workflow)?;

    Ok(workflow)
}

/// Load and parse a workflow file; `.json` files are read as JSON, anything else as YAML.
///
/// # Example
///
/// ```rust,no_run
/// use opflow::definition::load_file;
///
/// let workflow = load_file("workflow.yaml")?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_file(path: impl AsRef<Path>) -> Result<Workflow> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;

    let parsed = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&content),
        _ => parse_yaml(&content),
    };
    parsed.with_context(|| format!("Failed to parse workflow file: {}", path.display()))
}

/// Validate a workflow.
fn validate(workflow: &Workflow) -> Result<()> {
    if workflow.name.is_empty() {
        anyhow::bail!("Workflow name cannot be empty");
    }

    validate_ops(&workflow.ops, "ops")
}

fn validate_ops(ops: &[Op], location: &str) -> Result<()> {
    for (i, op) in ops.iter().enumerate() {
        if op.kind.trim().is_empty() {
            anyhow::bail!("Op {location}[{i}] has empty kind");
        }
        if op.param("ops").is_some() {
            let inner = op
                .ops()
                .with_context(|| format!("Op {location}[{i}] ({}) has malformed inner ops", op.kind))?;
            validate_ops(&inner, &format!("{location}[{i}].ops"))?;
        }
    }

    Ok(())
}
