// ai
//! 📦 Common data structures: the building blocks of avrolift
//!
//! 🎬 COLD OPEN: INT. OBJECT STORAGE BUCKET: 3:47 AM
//!
//! An Avro file lands. Nobody asked for it. Nobody ever asks for it. It has a
//! schema in its header and a thousand records in its belly, and every other
//! field is wrapped in a union like it's wearing a parka indoors.
//!
//! This module defines the humble structs that carry those records from the
//! decoder to the bulk payload: [`FieldValue`], the tagged union that replaced
//! "just throw it in an `interface{}` and pray", and [`Record`], the map of
//! field names to those values.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use std::collections::BTreeMap;

use serde::Serialize;

/// 📦 A `Record`: one decoded Avro datum, flattened into field name → value.
///
/// `BTreeMap` on purpose: field iteration and JSON key order are sorted, so the
/// same input renders the same bytes every time. Tests sleep better. So do we.
pub type Record = BTreeMap<String, FieldValue>;

/// 🎭 The many faces of a field value.
///
/// The decoder lifts every Avro value into one of these. The normalizer then
/// unwraps the tagged ones and coerces the stringly-typed ones. The renderer
/// serializes whatever is left as plain JSON: `#[serde(untagged)]` means a
/// `FieldValue::Float(12.5)` goes out the door as `12.5`, no costume.
///
/// A union value that came out of the decoder looks like
/// `Map({"string": String("p1")})`: a single-entry map whose key names the
/// branch type. That's the "tagged scalar" the normalizer hunts for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// 🕳️ null. The void. Serializes as `null`.
    Null,
    Boolean(bool),
    /// 🔢 int and long both land here. Avro had two integer types; JSON has zero.
    Integer(i64),
    /// 🌊 float and double both land here, widened to f64.
    Float(f64),
    String(String),
    Array(Vec<FieldValue>),
    /// 🪆 records, maps, and tagged scalars. Russian dolls of JSON.
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// 🏷️ Short name of the variant, for log lines that want to say what they found.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 🔎 True for values with nothing nested inside. Maps and arrays need not apply.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldValue::Array(_) | FieldValue::Map(_))
    }
}

impl From<serde_json::Value> for FieldValue {
    /// 🔄 JSON → FieldValue. Used as the decoder's escape hatch for exotic Avro
    /// logical types (decimals, durations) that only know how to become JSON.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                // -- u64 beyond i64::MAX and real floats both end up here. f64 it is.
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// 🏷️ Builds a tagged scalar: `{tag: value}`: the shape a decoded Avro union takes.
pub fn tagged(tag: &str, value: impl Into<FieldValue>) -> FieldValue {
    let mut the_wrapper = BTreeMap::new();
    the_wrapper.insert(tag.to_string(), value.into());
    FieldValue::Map(the_wrapper)
}
