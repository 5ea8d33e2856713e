//! Optional dynamic values.
//!
//! Several engine columns hold lists, scalars or null depending on the
//! customer configuration. `DynValue` keeps whatever shape was supplied so a
//! save/load cycle never collapses e.g. `[1, 2]` into a string.

use ordered_float::OrderedFloat;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`; kept exact instead of degrading to a float.
    UInt(u64),
    Float(OrderedFloat<f64>),
    Text(String),
    List(Vec<DynValue>),
    Map(BTreeMap<String, DynValue>),
}

impl DynValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DynValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DynValue::Int(i) => Some(*i),
            DynValue::UInt(u) => i64::try_from(*u).ok(),
            DynValue::Float(f) if f.fract() == 0.0 => Some(f.0 as i64),
            _ => None,
        }
    }

    /// Coarse type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            DynValue::Null => "null",
            DynValue::Bool(_) => "boolean",
            DynValue::Int(_) | DynValue::UInt(_) => "integer",
            DynValue::Float(_) => "float",
            DynValue::Text(_) => "string",
            DynValue::List(_) => "list",
            DynValue::Map(_) => "map",
        }
    }
}

// Any JSON value is acceptable where a dynamic value is expected.
impl JsonSchema for DynValue {
    fn schema_name() -> String {
        "DynValue".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        Schema::Bool(true)
    }
}

impl From<bool> for DynValue {
    fn from(b: bool) -> Self {
        DynValue::Bool(b)
    }
}

impl From<i64> for DynValue {
    fn from(i: i64) -> Self {
        DynValue::Int(i)
    }
}

impl From<u64> for DynValue {
    fn from(u: u64) -> Self {
        i64::try_from(u).map(DynValue::Int).unwrap_or(DynValue::UInt(u))
    }
}

impl From<f64> for DynValue {
    fn from(f: f64) -> Self {
        DynValue::Float(OrderedFloat(f))
    }
}

impl From<&str> for DynValue {
    fn from(s: &str) -> Self {
        DynValue::Text(s.to_string())
    }
}

impl From<String> for DynValue {
    fn from(s: String) -> Self {
        DynValue::Text(s)
    }
}

impl<T: Into<DynValue>> From<Vec<T>> for DynValue {
    fn from(items: Vec<T>) -> Self {
        DynValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for DynValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "<{}>", self.type_name()),
        }
    }
}
