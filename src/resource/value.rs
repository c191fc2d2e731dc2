//! The native scalar shapes a [`crate::resource::property::Property`] can
//! hold: a tagged variant in place of an untyped `any`, so callers get a
//! typed error instead of a runtime panic when they ask for the wrong
//! shape.

use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use std::cmp::Ordering;

/// A single scalar SCIM value. Complex and multivalued shapes are modeled
/// by [`crate::resource::property::Property`] itself, not here — `Value`
/// only ever appears inside a `Property::Simple`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Dec(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
    Bytes(Vec<u8>),
    Ref(String),
}

impl Value {
    /// Render this value back to `serde_json::Value`, the wire shape the
    /// JSON Codec consumes and produces.
    pub fn to_json(&self) -> Json {
        match self {
            Value::String(s) => Json::String(s.clone()),
            Value::Int(i) => Json::from(*i),
            Value::Dec(d) => serde_json::Number::from_f64(*d)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Bool(b) => Json::Bool(*b),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            Value::Bytes(b) => Json::String(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                b,
            )),
            Value::Ref(s) => Json::String(s.clone()),
        }
    }

    /// The canonical string form used for hashing and for
    /// non-ordering comparators (`eq`, `sw`, `ew`, `co`). Case-folded unless
    /// `case_exact` is set.
    pub fn canonical_string(&self, case_exact: bool) -> String {
        let raw = match self {
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Dec(d) => d.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            Value::Bytes(b) => {
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b)
            }
            Value::Ref(s) => s.clone(),
        };
        if case_exact {
            raw
        } else {
            raw.to_lowercase()
        }
    }

    /// Ordering comparison for `gt`/`lt`/`ge`/`le`. Returns `None` when the
    /// two values aren't order-comparable (`incompatible-op`).
    pub fn partial_compare(&self, other: &Value, case_exact: bool) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Dec(a), Value::Dec(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Dec(b)) => (*a as f64).partial_cmp(b),
            (Value::Dec(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::DateTime(a), Value::DateTime(b)) => a.partial_cmp(b),
            (Value::String(_), Value::String(_)) => {
                let a = self.canonical_string(case_exact);
                let b = other.canonical_string(case_exact);
                a.partial_cmp(&b)
            }
            _ => None,
        }
    }

    /// Type name used in error messages and the validator.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "integer",
            Value::Dec(_) => "decimal",
            Value::Bool(_) => "boolean",
            Value::DateTime(_) => "dateTime",
            Value::Bytes(_) => "binary",
            Value::Ref(_) => "reference",
        }
    }
}
