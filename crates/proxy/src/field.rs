//! Values as seen through a proxy.

use crate::proxy::Proxy;
use alloc::string::String;
use stagehand_core::{Record, Value};

/// An attribute value that may itself be a proxy.
///
/// View models hand proxies around as attribute values (a detail editor
/// assigning a wrapped club to a wrapped skater, say). Persistence only ever
/// sees the unwrapped record.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    Value(Value),
    Proxy(Proxy),
}

impl Field {
    /// Dereferences through proxy layers down to a plain value.
    pub fn to_value(&self) -> Value {
        match self {
            Field::Value(v) => v.clone(),
            Field::Proxy(p) => Value::Record(p.source().clone()),
        }
    }

    /// The record this field points at, unwrapped.
    pub fn as_record(&self) -> Option<Record> {
        match self {
            Field::Value(Value::Record(r)) => Some(r.clone()),
            Field::Proxy(p) => Some(p.source().clone()),
            Field::Value(_) => None,
        }
    }

    /// Returns the proxy if this field holds one.
    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Field::Proxy(p) => Some(p),
            Field::Value(_) => None,
        }
    }

    /// Returns true for a plain Null.
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Value(Value::Null))
    }
}

/// Dereferences `value` through proxy layers; identity for plain values.
pub fn unwrap(value: &Field) -> Value {
    value.to_value()
}

impl From<Value> for Field {
    fn from(v: Value) -> Self {
        Field::Value(v)
    }
}

impl From<Proxy> for Field {
    fn from(p: Proxy) -> Self {
        Field::Proxy(p)
    }
}

impl From<&Proxy> for Field {
    fn from(p: &Proxy) -> Self {
        Field::Proxy(p.clone())
    }
}

impl From<Record> for Field {
    fn from(r: Record) -> Self {
        Field::Value(Value::Record(r))
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Value(Value::from(v))
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Value(Value::String(v))
    }
}

impl From<bool> for Field {
    fn from(v: bool) -> Self {
        Field::Value(Value::Boolean(v))
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Value(Value::Int32(v))
    }
}

impl From<i64> for Field {
    fn from(v: i64) -> Self {
        Field::Value(Value::Int64(v))
    }
}

impl From<f64> for Field {
    fn from(v: f64) -> Self {
        Field::Value(Value::Float64(v))
    }
}
