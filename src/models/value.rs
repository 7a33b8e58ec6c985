//! Loosely typed scalar values.
//!
//! Values collected from users or loaded from JSON configuration may be strings,
//! numbers, booleans or null. Template substitution only ever needs their text,
//! so every variant has a single stringification rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value with an explicit type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON `null`; renders as the empty string.
    Null,

    /// Boolean flag; renders as `true` or `false`.
    Bool(bool),

    /// Numeric value; integral numbers render without a decimal point.
    Number(f64),

    /// Text value, rendered verbatim.
    String(String),
}

impl Value {
    /// Converts a JSON scalar into a `Value`.
    ///
    /// Returns `None` for arrays and objects, which have no scalar rendering.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
