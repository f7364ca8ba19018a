//! A transport-agnostic structured value, standing in for the structured-expression
//! value system that carries request and result payloads in a real probe.
//!
//! This layer never binds to a particular wire format. Reference transports convert
//! to/from `serde_json::Value` only at their own edge (see [`crate::transport`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A polymorphic request/result payload.
///
/// The dispatch core only ever calls [`Value::get_attribute`] on this type — it
/// never interprets a payload beyond extracting the `id` attribute (§3 of the
/// design). Everything else is opaque and is handed to the evaluator untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Builds an object value from `(name, value)` pairs.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the value of `name` if this is an object and it has that attribute.
    ///
    /// Returns `None` for any other value shape, including non-object values — a
    /// request payload that is not an object has no attributes by definition.
    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(name),
            _ => None,
        }
    }

    /// Convenience constructor for a string-valued `Value`.
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}
