//! Best-effort typed reads over a canonical map.
//!
//! Every accessor degrades instead of failing: a missing key, a null value
//! and a value of the wrong type all yield the type's zero value. Collection
//! accessors drop wrongly-typed elements rather than rejecting the whole
//! collection. This layer never returns an error.

use crate::value::GenericMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// Reads a string, or `""`.
#[must_use]
pub fn get_string(m: &GenericMap, key: &str) -> String {
    m.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Reads an integer, or `0`.
///
/// Only integer-typed numbers qualify; floats and numeric strings do not.
#[must_use]
pub fn get_int(m: &GenericMap, key: &str) -> i64 {
    m.get(key).and_then(Value::as_i64).unwrap_or_default()
}

/// Reads a boolean, or `false`.
#[must_use]
pub fn get_bool(m: &GenericMap, key: &str) -> bool {
    m.get(key).and_then(Value::as_bool).unwrap_or_default()
}

/// Reads a list of strings, skipping non-string elements.
///
/// Returns `None` when the key is missing, null or not a list, so callers can
/// tell "absent" from "present but empty".
#[must_use]
pub fn get_string_slice(m: &GenericMap, key: &str) -> Option<Vec<String>> {
    let items = m.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

/// Reads a list of maps, skipping non-map elements.
#[must_use]
pub fn get_map_slice<'a>(m: &'a GenericMap, key: &str) -> Option<Vec<&'a GenericMap>> {
    let items = m.get(key)?.as_array()?;
    Some(items.iter().filter_map(Value::as_object).collect())
}

/// Reads a string-valued map, skipping entries whose value is not a string.
#[must_use]
pub fn get_string_map(m: &GenericMap, key: &str) -> Option<BTreeMap<String, String>> {
    let entries = m.get(key)?.as_object()?;
    Some(
        entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
    )
}

/// Reads a nested block.
///
/// Nested blocks arrive either as a map or as a list holding a single map;
/// the first map element wins.
#[must_use]
pub fn get_block<'a>(m: &'a GenericMap, key: &str) -> Option<&'a GenericMap> {
    match m.get(key)? {
        Value::Object(block) => Some(block),
        Value::Array(items) => items.iter().find_map(Value::as_object),
        _ => None,
    }
}
