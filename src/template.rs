//! `{{dotted.path}}` placeholder resolution.
//!
//! Placeholders are resolved in a single left-to-right pass against the
//! context. A path that cannot be walked resolves to the empty string, string
//! values are inserted verbatim and every other value is inserted as compact
//! JSON. Substituted text is never re-scanned.

use crate::context::{walk_path, Context};
use serde_json::{Map, Value};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Resolve every placeholder in `template` against `context`.
pub fn resolve(template: &str, context: &Context) -> String {
    if !template.contains(OPEN) {
        return template.to_string();
    }
    context.read(|vars| render(template, vars))
}

/// Resolve placeholders in every string inside a JSON value tree.
pub fn resolve_value(value: &Value, context: &Context) -> Value {
    match value {
        Value::String(s) => Value::String(resolve(s, context)),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render(template: &str, vars: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&substitution(after[..end].trim(), vars));
        rest = &after[end + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

fn substitution(path: &str, vars: &Map<String, Value>) -> String {
    match walk_path(vars, path) {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
