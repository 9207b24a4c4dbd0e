//! Dynamic configuration values
//!
//! A declarative controller hands configuration over as a tagged union that
//! can also be null (explicitly unset) or unknown (not yet computed during
//! planning). This module converts those values into a canonical generic tree
//! built from `serde_json::Value`.
//!
//! Conversion is total but lossy: null and unknown both collapse to the
//! absence of a value (`None`), never to an error or a zero value.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Canonical generic value: string, bool, integer, float, ordered list or keyed map.
pub type GenericValue = Value;

/// Canonical keyed mapping.
pub type GenericMap = Map<String, Value>;

/// A configuration value as received from the declarative controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    /// Explicitly unset
    Null,
    /// Not yet known (computed later during apply)
    Unknown,
    /// String scalar
    String(String),
    /// Boolean scalar
    Bool(bool),
    /// Integer-typed number
    Int(i64),
    /// Floating number (arbitrary precision inputs are narrowed to `f64`)
    Float(f64),
    /// Ordered sequence
    List(Vec<DynamicValue>),
    /// Unordered collection, enumerated in its natural order
    Set(Vec<DynamicValue>),
    /// Keyed collection with homogeneous values
    Map(BTreeMap<String, DynamicValue>),
    /// Structured record with named attributes
    Object(BTreeMap<String, DynamicValue>),
}

/// Converts a dynamic value into the canonical generic tree.
///
/// Returns `None` for null and unknown values. Lists and sets become arrays
/// in enumeration order, maps and objects become JSON objects. Absent
/// elements are dropped from arrays and absent entries are omitted from
/// objects. Empty collections stay empty collections.
///
/// Non-finite floats have no JSON representation and are treated as absent.
#[must_use]
pub fn to_generic(value: &DynamicValue) -> Option<GenericValue> {
    match value {
        DynamicValue::Null | DynamicValue::Unknown => None,
        DynamicValue::String(s) => Some(Value::String(s.clone())),
        DynamicValue::Bool(b) => Some(Value::Bool(*b)),
        DynamicValue::Int(i) => Some(Value::Number(Number::from(*i))),
        DynamicValue::Float(f) => Number::from_f64(*f).map(Value::Number),
        DynamicValue::List(items) | DynamicValue::Set(items) => {
            Some(Value::Array(items.iter().filter_map(to_generic).collect()))
        }
        DynamicValue::Map(entries) | DynamicValue::Object(entries) => {
            Some(Value::Object(entries_to_map(entries)))
        }
    }
}

/// Converts an object (or map) value into a generic map.
///
/// Returns `None` for null, unknown and non-keyed values.
#[must_use]
pub fn object_to_map(value: &DynamicValue) -> Option<GenericMap> {
    match value {
        DynamicValue::Map(entries) | DynamicValue::Object(entries) => Some(entries_to_map(entries)),
        _ => None,
    }
}

/// Converts a list (or set) value into a generic vector.
///
/// Returns `None` for null, unknown and non-sequence values.
#[must_use]
pub fn list_to_vec(value: &DynamicValue) -> Option<Vec<GenericValue>> {
    match value {
        DynamicValue::List(items) | DynamicValue::Set(items) => {
            Some(items.iter().filter_map(to_generic).collect())
        }
        _ => None,
    }
}

fn entries_to_map(entries: &BTreeMap<String, DynamicValue>) -> GenericMap {
    entries
        .iter()
        .filter_map(|(key, value)| to_generic(value).map(|v| (key.clone(), v)))
        .collect()
}

/// Lifts an already-generic value (parsed JSON/YAML) back into the dynamic model.
///
/// JSON null becomes `Null`; integers that fit `i64` stay integers, every
/// other number becomes a float.
impl From<Value> for DynamicValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}
