//! Sheet classification and row-to-record mapping

use serde_json::{Map, Value};

use crate::config::{FieldSchema, Settings};
use crate::source::SheetRow;
use crate::sync::normalize::{format_number, normalize_cell};

/// Column aliases tried in order when mapping a row.
pub const DATE_COLUMNS: &[&str] = &["Date", "Alert_Date"];
pub const LOCATION_COLUMNS: &[&str] = &["Location", "Room"];
pub const VALUE_COLUMNS: &[&str] = &["Value", "Severity"];
pub const STATUS_COLUMNS: &[&str] = &["Status", "Message"];
pub const SENSOR_ID_COLUMNS: &[&str] = &["Sensor_ID", "SensorID", "Type"];

/// Unit suffixes stripped before deciding a value is numeric.
const UNIT_SUFFIXES: &[&str] = &["%", "°C", "°F", "°"];

/// Minimum non-empty mapped fields (beyond date and time) for a row to count
/// as a record at all.
const MIN_MAPPED_FIELDS: usize = 3;

/// Destination record kind for a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Event,
    Measurement,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Event => write!(f, "event"),
            RecordKind::Measurement => write!(f, "measurement"),
        }
    }
}

/// Payload of a measurement reading: numeric when the cell is a plain number
/// (possibly unit-suffixed), textual otherwise. Exactly one is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasurementValue {
    /// Already-normalized numeric rendering
    Numeric(String),
    Text(String),
}

impl MeasurementValue {
    pub fn as_str(&self) -> &str {
        match self {
            MeasurementValue::Numeric(s) | MeasurementValue::Text(s) => s,
        }
    }
}

/// A classified, normalized record ready for identity keying and upload.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateRecord {
    Event {
        date: String,
        time: String,
        location: String,
        severity: String,
        message: String,
        sensor_type_id: String,
    },
    Measurement {
        date: String,
        time: String,
        location: String,
        sensor_type_id: String,
        status: String,
        is_active: bool,
        value: MeasurementValue,
    },
}

impl CandidateRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            CandidateRecord::Event { .. } => RecordKind::Event,
            CandidateRecord::Measurement { .. } => RecordKind::Measurement,
        }
    }

    pub fn date(&self) -> &str {
        match self {
            CandidateRecord::Event { date, .. } | CandidateRecord::Measurement { date, .. } => date,
        }
    }

    pub fn time(&self) -> &str {
        match self {
            CandidateRecord::Event { time, .. } | CandidateRecord::Measurement { time, .. } => time,
        }
    }

    /// Date and time are the identity-critical fields; a record without them
    /// never reaches the key builder or the wire.
    pub fn has_identity(&self) -> bool {
        !self.date().is_empty() && !self.time().is_empty()
    }

    /// Serialize for upload. Empty fields are left out of the payload, as the
    /// destination treats absent and empty differently in list views.
    pub fn to_payload(&self, schema: &FieldSchema) -> Value {
        let mut payload = Map::new();
        match self {
            CandidateRecord::Event {
                date,
                time,
                location,
                severity,
                message,
                sensor_type_id,
            } => {
                let fields = &schema.event;
                insert_non_empty(&mut payload, &fields.date, date);
                insert_non_empty(&mut payload, &fields.time, time);
                insert_non_empty(&mut payload, &fields.location, location);
                insert_non_empty(&mut payload, &fields.severity, severity);
                insert_non_empty(&mut payload, &fields.message, message);
                insert_non_empty(&mut payload, &fields.sensor_type, sensor_type_id);
            }
            CandidateRecord::Measurement {
                date,
                time,
                location,
                sensor_type_id,
                status,
                is_active,
                value,
            } => {
                let fields = &schema.measurement;
                insert_non_empty(&mut payload, &fields.date, date);
                insert_non_empty(&mut payload, &fields.time, time);
                insert_non_empty(&mut payload, &fields.location, location);
                insert_non_empty(&mut payload, &fields.sensor_type, sensor_type_id);
                insert_non_empty(&mut payload, &fields.status, status);
                match value {
                    MeasurementValue::Numeric(v) => {
                        insert_non_empty(&mut payload, &fields.value, v)
                    }
                    MeasurementValue::Text(v) => {
                        insert_non_empty(&mut payload, &fields.value_text, v)
                    }
                }
                payload.insert(fields.is_active.clone(), Value::Bool(*is_active));
            }
        }
        Value::Object(payload)
    }

    /// One-line description for console output.
    pub fn describe(&self) -> String {
        match self {
            CandidateRecord::Event {
                date,
                time,
                location,
                severity,
                message,
                ..
            } => format!("event {date} {time} [{location}] {severity}: {message}"),
            CandidateRecord::Measurement {
                date,
                time,
                location,
                value,
                ..
            } => format!(
                "measurement {date} {time} [{location}] = {}",
                value.as_str()
            ),
        }
    }
}

fn insert_non_empty(payload: &mut Map<String, Value>, field: &str, value: &str) {
    if !value.is_empty() {
        payload.insert(field.to_string(), Value::String(value.to_string()));
    }
}

/// A sheet is the alert-event sheet iff its trimmed name equals the
/// configured label, case-insensitively. Everything else is a sensor channel.
pub fn classify(sheet_name: &str, alert_label: &str) -> RecordKind {
    if sheet_name.trim().eq_ignore_ascii_case(alert_label.trim()) {
        RecordKind::Event
    } else {
        RecordKind::Measurement
    }
}

/// Ordered-fallback column lookup: the first present, non-null cell among the
/// candidate keys.
pub fn first_present<'a>(row: &'a SheetRow, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| row.get(*key))
        .find(|value| !value.is_null())
}

/// Decide whether a raw cell is a numeric reading or a textual one.
///
/// Date- and time-shaped strings always land in the text branch, even when
/// they would coincidentally parse after suffix stripping.
pub fn infer_value(raw: &str) -> MeasurementValue {
    let trimmed = raw.trim();
    if looks_like_date_or_time(trimmed) {
        return MeasurementValue::Text(trimmed.to_string());
    }

    let mut stripped = trimmed;
    for suffix in UNIT_SUFFIXES {
        if let Some(rest) = stripped.strip_suffix(suffix) {
            stripped = rest.trim_end();
            break;
        }
    }

    match stripped.parse::<f64>() {
        Ok(n) if n.is_finite() => MeasurementValue::Numeric(format_number(n)),
        _ => MeasurementValue::Text(trimmed.to_string()),
    }
}

/// Times contain `:`; dates carry two or more dashes past any leading sign.
fn looks_like_date_or_time(value: &str) -> bool {
    if value.contains(':') {
        return true;
    }
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    unsigned.matches('-').count() >= 2
}

/// Map a sampled row to a candidate record.
///
/// Returns `None` for structurally empty rows: fewer than three non-empty
/// mapped fields beyond date and time is a formatting artifact, not data.
pub fn map_to_record(
    row: &SheetRow,
    kind: RecordKind,
    sensor_type_id: &str,
    settings: &Settings,
) -> Option<CandidateRecord> {
    let timestamp_columns: Vec<&str> = settings
        .timestamp_columns
        .iter()
        .map(String::as_str)
        .collect();

    let date = lookup(row, DATE_COLUMNS);
    let time = lookup(row, &timestamp_columns);
    let location = lookup(row, LOCATION_COLUMNS);
    let raw_value = lookup(row, VALUE_COLUMNS);
    let status = lookup(row, STATUS_COLUMNS);

    // A row-level sensor id column overrides the sheet-level resolution
    let sensor_type = match lookup(row, SENSOR_ID_COLUMNS) {
        id if !id.is_empty() => id,
        _ => sensor_type_id.to_string(),
    };

    let mapped_fields = [&location, &raw_value, &status, &sensor_type];
    let populated = mapped_fields.iter().filter(|f| !f.is_empty()).count();
    if populated < MIN_MAPPED_FIELDS {
        return None;
    }

    Some(match kind {
        RecordKind::Event => CandidateRecord::Event {
            date,
            time,
            location,
            severity: raw_value,
            message: status,
            sensor_type_id: sensor_type,
        },
        RecordKind::Measurement => CandidateRecord::Measurement {
            date,
            time,
            location,
            sensor_type_id: sensor_type,
            status,
            is_active: true,
            value: infer_value(&raw_value),
        },
    })
}

fn lookup(row: &SheetRow, keys: &[&str]) -> String {
    first_present(row, keys)
        .map(normalize_cell)
        .unwrap_or_default()
}
