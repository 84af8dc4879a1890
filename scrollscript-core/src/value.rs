//! Runtime values in ScrollScript
//!
//! Values are what the DSL coerces scalar text into: numbers, booleans,
//! text, deferred `calc(...)` expressions, and the nested lists/objects that
//! vars-lists and built configs are made of. A `Value` serializes to plain
//! JSON and deserializes back to the same variant.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Ordered string-keyed map of values (vars, scrollTrigger blocks, overrides)
pub type ValueMap = BTreeMap<String, Value>;

/// Runtime value in ScrollScript
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    /// Deferred `calc(...)` expression, evaluated at attach time
    Expr(String),
    List(Vec<Value>),
    Object(ValueMap),
}

impl Value {
    // ========== Safe Accessors (never panic) ==========

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// Textual form; deferred expressions read back as their `calc(...)` source
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Expr(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for `calc(...)` values still waiting for live geometry
    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Expr(_))
    }

    /// True if this value or anything nested inside it is deferred
    pub fn contains_deferred(&self) -> bool {
        match self {
            Value::Expr(_) => true,
            Value::List(items) => items.iter().any(Value::contains_deferred),
            Value::Object(map) => map.values().any(Value::contains_deferred),
            _ => false,
        }
    }

    /// Type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Number(_) => "Number",
            Value::Text(_) => "Text",
            Value::Expr(_) => "Expr",
            Value::List(_) => "List",
            Value::Object(_) => "Object",
        }
    }

    /// String value; `calc(...)` text always becomes a deferred expression,
    /// so a `Text` never holds something JSON would read back as `Expr`
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if is_calc_expression(&s) {
            Value::Expr(s)
        } else {
            Value::Text(s)
        }
    }

    // ========== JSON Conversion ==========

    /// Convert from a JSON tree. Integers stay integers and `calc(...)`
    /// strings come back as deferred expressions.
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Number(n.as_f64().unwrap_or(0.0)),
            },
            JsonValue::String(s) => Value::text(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from_json).collect()),
            JsonValue::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect())
            }
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Text(s) | Value::Expr(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => {
                JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

/// `calc(...)` wrapper check shared by coercion and deserialization
pub fn is_calc_expression(s: &str) -> bool {
    let s = s.trim();
    s.len() > 6 && s.starts_with("calc(") && s.ends_with(')')
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) | Value::Expr(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Value::from_json)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) | Value::Expr(s) => write!(f, "{}", s),
            Value::List(items) => {
                let contents: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", contents.join(", "))
            }
            Value::Object(map) => {
                let contents: Vec<String> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", contents.join(", "))
            }
        }
    }
}

// From implementations for convenience
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Object(map)
    }
}
