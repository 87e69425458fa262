//! Versioned destination field schema
//!
//! The remote tables have renamed fields more than once; the mapping from
//! record kind to destination field names is explicit configuration rather
//! than hard-coded field sets, so schema drift stays a config change.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SCHEMA_VERSION: u32 = 1;

/// Destination field names per record kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub event: EventFields,
    #[serde(default)]
    pub measurement: MeasurementFields,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFields {
    pub date: String,
    pub time: String,
    pub location: String,
    pub severity: String,
    pub message: String,
    pub sensor_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementFields {
    pub date: String,
    pub time: String,
    pub location: String,
    pub sensor_type: String,
    pub status: String,
    pub value: String,
    pub value_text: String,
    pub is_active: String,
}

impl Default for EventFields {
    fn default() -> Self {
        Self {
            date: "alert_date".to_string(),
            time: "alert_timestamp".to_string(),
            location: "location".to_string(),
            severity: "severity".to_string(),
            message: "short_description".to_string(),
            sensor_type: "sensor_type".to_string(),
        }
    }
}

impl Default for MeasurementFields {
    fn default() -> Self {
        Self {
            date: "reading_date".to_string(),
            time: "reading_timestamp".to_string(),
            location: "location".to_string(),
            sensor_type: "sensor_type".to_string(),
            status: "status".to_string(),
            value: "value".to_string(),
            value_text: "value_text".to_string(),
            is_active: "is_active".to_string(),
        }
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            event: EventFields::default(),
            measurement: MeasurementFields::default(),
        }
    }
}

impl FieldSchema {
    /// Load a schema override from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        let schema: FieldSchema = toml::from_str(&content)
            .with_context(|| format!("Failed to parse schema file: {}", path.display()))?;
        if schema.version != SCHEMA_VERSION {
            bail!(
                "Unsupported schema version {} in {} (expected {})",
                schema.version,
                path.display(),
                SCHEMA_VERSION
            );
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_alert_table() {
        let schema = FieldSchema::default();
        assert_eq!(schema.version, SCHEMA_VERSION);
        assert_eq!(schema.event.date, "alert_date");
        assert_eq!(schema.event.message, "short_description");
        assert_eq!(schema.measurement.value, "value");
        assert_eq!(schema.measurement.value_text, "value_text");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let schema: FieldSchema = toml::from_str(
            r#"
            version = 1

            [event]
            message = "description"
            "#,
        )
        .unwrap();
        assert_eq!(schema.event.message, "description");
        // Untouched fields keep their defaults
        assert_eq!(schema.event.date, "alert_date");
        assert_eq!(schema.measurement.status, "status");
    }

    #[test]
    fn test_toml_round_trip() {
        let schema = FieldSchema::default();
        let rendered = toml::to_string(&schema).unwrap();
        let parsed: FieldSchema = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, schema);
    }
}
