//! Immutable input fact bag.
//!
//! A `Context` takes ownership of its input at construction and only
//! hands out shared references afterwards, so no observable mutation
//! path exists and concurrent readers share it without locking.

use serde_json::{Map, Value};

/// The facts a decision is evaluated against.
///
/// Constructed from any JSON value; anything that is not an object
/// collapses to the empty mapping. Equality is structural.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Context {
    values: Map<String, Value>,
}

impl Context {
    pub fn new(input: Value) -> Self {
        match input {
            Value::Object(values) => Context { values },
            _ => Context { values: Map::new() },
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The value for `key`, or `default` when absent.
    pub fn fetch<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.values.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Resolve a dotted path (`"user.role"`) through nested mappings.
    /// Any missing or non-object intermediate yields None.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

impl From<Value> for Context {
    fn from(value: Value) -> Self {
        Context::new(value)
    }
}

impl From<Map<String, Value>> for Context {
    fn from(values: Map<String, Value>) -> Self {
        Context { values }
    }
}
