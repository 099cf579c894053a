use std::collections::BTreeMap;
use std::fmt::{self, Display};

use rand::Rng;

/// A GraphQL literal in argument position.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Rendered as a bare identifier.
    Enum(String),
    /// Rendered as `$name`; the actual value travels in the variables map.
    Variable(String),
    List(Vec<GraphValue>),
    Object(BTreeMap<String, GraphValue>),
}

impl Display for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::Null => f.write_str("null"),
            GraphValue::Boolean(b) => write!(f, "{b}"),
            GraphValue::Int(i) => write!(f, "{i}"),
            GraphValue::Float(fl) => write!(f, "{fl}"),
            GraphValue::String(s) => {
                // serde_json string encoding doubles as GraphQL string syntax
                match serde_json::to_string(s) {
                    Ok(encoded) => f.write_str(&encoded),
                    Err(_) => write!(f, "\"{s}\""),
                }
            }
            GraphValue::Enum(e) => f.write_str(e),
            GraphValue::Variable(name) => write!(f, "${name}"),
            GraphValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            GraphValue::Object(map) => {
                let rendered: Vec<String> =
                    map.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
        }
    }
}

impl From<&GraphValue> for serde_json::Value {
    fn from(value: &GraphValue) -> Self {
        match value {
            GraphValue::Null => serde_json::Value::Null,
            GraphValue::Boolean(b) => serde_json::Value::Bool(*b),
            GraphValue::Int(i) => serde_json::Value::Number((*i).into()),
            GraphValue::Float(fl) => serde_json::Number::from_f64(*fl)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            GraphValue::String(s) | GraphValue::Enum(s) => serde_json::Value::String(s.clone()),
            GraphValue::Variable(_) => serde_json::Value::Null,
            GraphValue::List(items) => {
                serde_json::Value::Array(items.iter().map(|v| v.into()).collect())
            }
            GraphValue::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}

/// Generates a plausible literal for a scalar, keyed off the type name.
/// Unknown scalars produce a recognisable `unknown <name>` string that
/// [`is_unknown_scalar`] detects, so callers can fall back to composite
/// generation.
pub fn scalar_value(name: &str, scalar: &str) -> GraphValue {
    let mut rng = rand::thread_rng();
    if scalar.contains("Boolean") {
        GraphValue::Boolean(rng.gen_range(0..500) % 2 == 0)
    } else if scalar.contains("Int") {
        GraphValue::Int(rng.gen_range(0..500))
    } else if scalar.contains("String") {
        GraphValue::String(format!("{name} string"))
    } else if scalar.contains("ID") {
        GraphValue::String(uuid::Uuid::new_v4().to_string())
    } else if scalar.contains("URI") || scalar.contains("URL") {
        GraphValue::String(format!("https://example.com/{name}"))
    } else if scalar.contains("DateTime") || scalar.contains("Date") {
        GraphValue::String("2024-01-01T00:00:00Z".to_string())
    } else if scalar.contains("HTML") {
        GraphValue::String(format!("<html><body><h1>{name}</h1></body></html>"))
    } else if scalar.contains("Float") {
        GraphValue::Float(rng.gen_range(0.0..500.0))
    } else {
        GraphValue::String(format!("unknown {name}"))
    }
}

pub fn is_unknown_scalar(value: &GraphValue) -> bool {
    matches!(value, GraphValue::String(s) if s.starts_with("unknown "))
}
