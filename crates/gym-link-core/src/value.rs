//! Native value shapes and the outgoing wire encoding
//!
//! Observations are decoded from the wire through [`Space::decode_value`];
//! actions originate locally and are encoded back to wire-safe JSON with
//! [`SpaceValue::to_wire`]. The directionality split is deliberate: in
//! remote mode observations always arrive from the wire, actions always
//! leave the process.
//!
//! [`Space::decode_value`]: crate::space::Space::decode_value

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A value in the native shape implied by a space
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SpaceValue {
    /// Integer scalar (Discrete)
    Int(i64),
    /// Real scalar
    Float(f64),
    /// Free-text action (text environments)
    Text(String),
    /// Integer vector (MultiBinary, MultiDiscrete)
    Ints(Vec<i64>),
    /// Real vector (Box)
    Floats(Vec<f64>),
    /// Ordered elements (Tuple)
    Tuple(Vec<SpaceValue>),
    /// Named elements (Dict)
    Dict(HashMap<String, SpaceValue>),
    /// Anything that bypassed space decoding
    Raw(serde_json::Value),
}

impl SpaceValue {
    /// Encode this value into wire-safe JSON.
    ///
    /// Numeric arrays flatten to plain number lists, scalars and strings
    /// pass through unchanged, tuples and dicts recurse element-wise.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            SpaceValue::Int(i) => serde_json::json!(i),
            SpaceValue::Float(f) => serde_json::json!(f),
            SpaceValue::Text(s) => serde_json::json!(s),
            SpaceValue::Ints(v) => serde_json::json!(v),
            SpaceValue::Floats(v) => serde_json::json!(v),
            SpaceValue::Tuple(vals) => {
                serde_json::Value::Array(vals.iter().map(SpaceValue::to_wire).collect())
            }
            SpaceValue::Dict(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect(),
            ),
            SpaceValue::Raw(v) => v.clone(),
        }
    }

    /// Whether this value is a passthrough null.
    pub fn is_null(&self) -> bool {
        matches!(self, SpaceValue::Raw(serde_json::Value::Null))
    }
}

impl From<i64> for SpaceValue {
    fn from(v: i64) -> Self {
        SpaceValue::Int(v)
    }
}

impl From<f64> for SpaceValue {
    fn from(v: f64) -> Self {
        SpaceValue::Float(v)
    }
}

impl From<&str> for SpaceValue {
    fn from(v: &str) -> Self {
        SpaceValue::Text(v.to_string())
    }
}

impl From<Vec<f64>> for SpaceValue {
    fn from(v: Vec<f64>) -> Self {
        SpaceValue::Floats(v)
    }
}

impl From<Vec<i64>> for SpaceValue {
    fn from(v: Vec<i64>) -> Self {
        SpaceValue::Ints(v)
    }
}
