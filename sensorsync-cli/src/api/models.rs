//! Wire types for the Table API

use serde::Deserialize;
use serde_json::Value;

/// Envelope for list responses: `{"result": [...]}`.
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub result: Vec<Value>,
}

/// Envelope for single-record responses: `{"result": {...}}`.
#[derive(Debug, Deserialize)]
pub struct RecordResponse {
    pub result: Value,
}

/// The opaque identifier of a stored record, if present.
pub fn record_sys_id(record: &Value) -> Option<&str> {
    record.get("sys_id").and_then(Value::as_str)
}

/// Read a field of a remote record as a string slice; missing or non-string
/// fields read as empty.
pub fn field_str<'a>(record: &'a Value, name: &str) -> &'a str {
    record.get(name).and_then(Value::as_str).unwrap_or("")
}
