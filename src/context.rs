//! The tagged `Value`/`Context` model step functions read and write.
//! Step functions never throw in the Rust sense; they return a
//! [`StepOutcome`] which the executor interprets to decide whether the
//! scenario continues, is pending, or has failed.
//!
//! `Value` covers the common scalar and collection shapes directly so
//! most step functions never need the `Opaque` escape hatch; `Opaque`
//! exists for values that genuinely don't fit (a handle, a connection)
//! without forcing every consumer of `Context` to downcast `dyn Any`.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Float(f64),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Seq(items) => write!(f, "Seq({items:?})"),
            Value::Map(map) => write!(f, "Map({map:?})"),
            Value::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Per-scenario mutable state threaded through every step call. Each
/// scenario starts with an empty `Context` and steps accumulate into it
/// as they run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Shallow merge: keys in `other` override keys already present.
    pub fn merge(&mut self, other: Context) {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The payload of a failed step: a human-readable message plus
/// optional structured data for a report to render alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct StepError {
    pub message: String,
    pub data: Option<BTreeMap<String, Value>>,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        StepError { message: message.into(), data: None }
    }

    pub fn with_data(message: impl Into<String>, data: BTreeMap<String, Value>) -> Self {
        StepError { message: message.into(), data: Some(data) }
    }
}

/// What a step function hands back to the executor. `Continue(Some(_))`
/// merges the given updates into the scenario's context; `Continue(None)`
/// leaves it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Continue(Option<Context>),
    Pending,
    Fail(StepError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_existing_keys() {
        let mut ctx = Context::new();
        ctx.set("a", "one");
        ctx.set("b", 2i64);

        let mut update = Context::new();
        update.set("a", "two");
        ctx.merge(update);

        assert_eq!(ctx.get("a").unwrap().as_str(), Some("two"));
        assert_eq!(ctx.get("b").unwrap().as_int(), Some(2));
    }

    #[test]
    fn value_conversions_round_trip() {
        let v: Value = "hello".into();
        assert_eq!(v.as_str(), Some("hello"));
        let n: Value = 42i64.into();
        assert_eq!(n.as_int(), Some(42));
    }
}
