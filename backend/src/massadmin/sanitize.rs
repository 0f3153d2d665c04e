//! Strips a request's attribute map down to what survives JSON serialization.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Nested maps deeper than this are replaced by `null`.
pub const MAX_DEPTH: usize = 10;

pub type AttrMap = BTreeMap<String, RequestAttr>;

#[derive(Debug, Clone)]
pub enum RequestAttr {
    /// Already plain data.
    Json(Value),
    /// Raw bytes, kept only when they are valid UTF-8.
    Bytes(Vec<u8>),
    Map(AttrMap),
    /// A live handle (session, upload, connection). Never serializable.
    Opaque(&'static str),
}

pub fn remove_nonserializable(attrs: &AttrMap) -> Map<String, Value> {
    clean_map(attrs, 0)
}

fn clean_map(attrs: &AttrMap, depth: usize) -> Map<String, Value> {
    attrs
        .iter()
        .map(|(key, value)| (key.clone(), clean_value(value, depth)))
        .collect()
}

fn clean_value(value: &RequestAttr, depth: usize) -> Value {
    match value {
        RequestAttr::Json(value) => value.clone(),
        RequestAttr::Bytes(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null),
        RequestAttr::Map(_) if depth >= MAX_DEPTH => Value::Null,
        RequestAttr::Map(nested) => Value::Object(clean_map(nested, depth + 1)),
        RequestAttr::Opaque(_) => Value::Null,
    }
}
