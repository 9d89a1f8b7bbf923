//! Execution context threaded through a workflow run.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Reserved key that always holds the most recent dispatch's result.
pub const OUTPUT_KEY: &str = "_output";

/// Mutable key-value environment shared by the ops of a run.
///
/// `Context` is a handle: cloning it aliases the same storage, which is how
/// `parallel` branches observe each other's writes. Use [`Context::deep_copy`]
/// for an isolated copy. The lock is only held for the duration of a single
/// read or write, never across an await point.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: Arc<Mutex<Map<String, Value>>>,
}

impl Context {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seed of a single key.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value.into());
        self
    }

    /// Set a variable.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.vars.lock().insert(key.into(), value);
    }

    /// Get a top-level variable.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.vars.lock().get(key).cloned()
    }

    /// Remove a top-level variable, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.vars.lock().remove(key)
    }

    /// Check whether a top-level key is bound.
    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.lock().contains_key(key)
    }

    /// Look up a dot-separated path (`a.b.0.c`). Array segments are indices.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        self.read(|vars| walk_path(vars, path).cloned())
    }

    /// Result of the most recent dispatch.
    pub fn output(&self) -> Option<Value> {
        self.get(OUTPUT_KEY)
    }

    /// Truthiness of the value at `path`; unbound paths are falsy.
    pub fn is_truthy(&self, path: &str) -> bool {
        self.read(|vars| walk_path(vars, path).is_some_and(is_truthy))
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.vars.lock().len()
    }

    /// Check if no keys are bound.
    pub fn is_empty(&self) -> bool {
        self.vars.lock().is_empty()
    }

    /// All top-level keys.
    pub fn keys(&self) -> Vec<String> {
        self.vars.lock().keys().cloned().collect()
    }

    /// Point-in-time copy of every binding.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.vars.lock().clone()
    }

    /// Get all variables as a JSON object.
    pub fn as_json(&self) -> Value {
        Value::Object(self.snapshot())
    }

    /// Structural copy with its own storage; writes to either side stay local.
    pub fn deep_copy(&self) -> Self {
        Self::from(self.snapshot())
    }

    /// Isolated copy of this context plus one extra binding.
    pub fn derive(&self, key: impl Into<String>, value: Value) -> Self {
        let derived = self.deep_copy();
        derived.set(key, value);
        derived
    }

    /// True when both handles point at the same storage.
    pub fn shares_storage(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.vars, &other.vars)
    }

    /// Run a closure against the bindings under a single lock acquisition.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Map<String, Value>) -> R) -> R {
        f(&self.vars.lock())
    }
}

impl From<Map<String, Value>> for Context {
    fn from(vars: Map<String, Value>) -> Self {
        Self {
            vars: Arc::new(Mutex::new(vars)),
        }
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage(other) || self.snapshot() == other.snapshot()
    }
}

/// Walk a dot-separated path from the top-level bindings.
pub(crate) fn walk_path<'a>(vars: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = vars.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Loose truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
