//! Composite identity keys for duplicate detection
//!
//! The remote tables have no natural primary key for this data, so identity
//! is structural: the normalized, delimiter-joined field set of a record.
//! The same function keys both a local candidate and a fetched remote record;
//! the two must agree byte-for-byte for a record and its stored echo, which
//! is the contract the whole sync rests on.

use serde_json::Value;

use super::classify::{CandidateRecord, RecordKind};
use crate::api::field_str;
use crate::config::FieldSchema;
use crate::sync::normalize::normalize_text;

/// Unit-separator control char; spreadsheet text never contains it, and any
/// occurrence is scrubbed during key building to keep the join unambiguous.
pub const KEY_DELIMITER: char = '\u{1F}';

fn key_part(value: &str) -> String {
    let normalized = normalize_text(value);
    if normalized.contains(KEY_DELIMITER) {
        normalized.replace(KEY_DELIMITER, " ")
    } else {
        normalized
    }
}

fn join_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| key_part(p))
        .collect::<Vec<_>>()
        .join(&KEY_DELIMITER.to_string())
}

/// Identity key of a candidate record. `None` when the identity-critical
/// fields (date, time) are missing; such records never reach the wire.
pub fn candidate_key(record: &CandidateRecord) -> Option<String> {
    if !record.has_identity() {
        return None;
    }
    Some(match record {
        CandidateRecord::Event {
            date,
            time,
            location,
            severity,
            message,
            sensor_type_id,
        } => join_key(&[date, time, location, severity, message, sensor_type_id]),
        CandidateRecord::Measurement {
            date,
            time,
            location,
            sensor_type_id,
            status,
            is_active,
            value,
        } => {
            let active = if *is_active { "true" } else { "false" };
            join_key(&[
                date,
                time,
                location,
                sensor_type_id,
                status,
                value.as_str(),
                active,
            ])
        }
    })
}

/// Identity key of a fetched remote record, reading the destination fields
/// named by the schema in the same order as `candidate_key`.
pub fn remote_key(kind: RecordKind, record: &Value, schema: &FieldSchema) -> String {
    match kind {
        RecordKind::Event => {
            let f = &schema.event;
            join_key(&[
                field_str(record, &f.date),
                field_str(record, &f.time),
                field_str(record, &f.location),
                field_str(record, &f.severity),
                field_str(record, &f.message),
                field_str(record, &f.sensor_type),
            ])
        }
        RecordKind::Measurement => {
            let f = &schema.measurement;
            // Exactly one of value / value_text was uploaded
            let value = match field_str(record, &f.value) {
                "" => field_str(record, &f.value_text),
                v => v,
            };
            let active = match record.get(&f.is_active) {
                Some(Value::Bool(b)) => {
                    if *b {
                        "true"
                    } else {
                        "false"
                    }
                }
                Some(Value::String(s)) => s.as_str(),
                _ => "",
            };
            join_key(&[
                field_str(record, &f.date),
                field_str(record, &f.time),
                field_str(record, &f.location),
                field_str(record, &f.sensor_type),
                field_str(record, &f.status),
                value,
                active,
            ])
        }
    }
}
