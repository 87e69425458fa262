//! Runtime configuration resolved once at startup
//!
//! All environment access happens here. The resulting `Settings` struct is
//! passed by reference into the sync engine; core logic never reads the
//! environment on its own.

use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use std::env;
use std::time::Duration;

pub mod schema;

pub use schema::{EventFields, FieldSchema, MeasurementFields};

/// Everything the sync engine needs to know about its surroundings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// ServiceNow instance name (the `{instance}.service-now.com` part)
    pub instance: String,
    pub username: String,
    pub password: String,
    /// Destination table for alert events
    pub event_table: String,
    /// Destination table for sensor measurements
    pub measurement_table: String,
    /// Lookup table holding sensor-type metadata
    pub lookup_table: String,
    /// Sheet name (trimmed, case-insensitive) that marks the alert-event sheet
    pub alert_sheet_label: String,
    /// Daily target instants for window sampling, in selection order
    pub target_instants: Vec<NaiveTime>,
    /// Sensor-type id used when no lookup entry matches a sheet
    pub default_sensor_type: String,
    /// Timestamp column names, tried in order
    pub timestamp_columns: Vec<String>,
    /// `sysparm_limit` for list requests
    pub page_limit: u32,
    pub request_timeout: Duration,
    /// Update matched records instead of skipping them
    pub update_existing: bool,
}

impl Settings {
    /// Build settings from the environment. Missing credentials are the only
    /// fatal startup condition; everything else has a default.
    pub fn from_env() -> Result<Self> {
        let instance = env::var("SERVICENOW_INSTANCE").unwrap_or_default();
        let username = env::var("SERVICENOW_USER").unwrap_or_default();
        let password = env::var("SERVICENOW_PASS").unwrap_or_default();

        if instance.is_empty() || username.is_empty() || password.is_empty() {
            bail!(
                "Missing required ServiceNow credentials: set SERVICENOW_INSTANCE, \
                 SERVICENOW_USER and SERVICENOW_PASS"
            );
        }

        let target_instants = parse_instants(
            &env::var("SYNC_TARGET_TIMES").unwrap_or_else(|_| "12:00,20:00".to_string()),
        )?;

        let timestamp_columns = parse_list(
            &env::var("SYNC_TIMESTAMP_COLUMNS")
                .unwrap_or_else(|_| "Alert_Timestamp,Timestamp,Time,Hour".to_string()),
        );

        let page_limit = env::var("SERVICENOW_PAGE_LIMIT")
            .ok()
            .map(|v| v.parse::<u32>().context("Invalid SERVICENOW_PAGE_LIMIT"))
            .transpose()?
            .unwrap_or(10_000);

        let timeout_secs = env::var("SERVICENOW_TIMEOUT_SECS")
            .ok()
            .map(|v| v.parse::<u64>().context("Invalid SERVICENOW_TIMEOUT_SECS"))
            .transpose()?
            .unwrap_or(30);

        Ok(Self {
            instance,
            username,
            password,
            event_table: env::var("SERVICENOW_EVENT_TABLE")
                .unwrap_or_else(|_| "iot_alert_event".to_string()),
            measurement_table: env::var("SERVICENOW_MEASUREMENT_TABLE")
                .unwrap_or_else(|_| "iot_sensor_log".to_string()),
            lookup_table: env::var("SERVICENOW_LOOKUP_TABLE")
                .unwrap_or_else(|_| "iot_sensor_type".to_string()),
            alert_sheet_label: env::var("SYNC_ALERT_SHEET").unwrap_or_else(|_| "Alerts".to_string()),
            target_instants,
            default_sensor_type: env::var("SYNC_DEFAULT_SENSOR_TYPE")
                .unwrap_or_else(|_| "unknown".to_string()),
            timestamp_columns,
            page_limit,
            request_timeout: Duration::from_secs(timeout_secs),
            update_existing: false,
        })
    }
}

/// Parse a comma-separated list of `HH:MM` instants.
fn parse_instants(raw: &str) -> Result<Vec<NaiveTime>> {
    let mut instants = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let instant = NaiveTime::parse_from_str(part, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(part, "%H:%M:%S"))
            .with_context(|| format!("Invalid target instant: {part}"))?;
        instants.push(instant);
    }
    if instants.is_empty() {
        bail!("SYNC_TARGET_TIMES resolved to an empty window list");
    }
    Ok(instants)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instants() {
        let instants = parse_instants("12:00, 20:00").unwrap();
        assert_eq!(
            instants,
            vec![
                NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_instants_with_seconds() {
        let instants = parse_instants("08:30:15").unwrap();
        assert_eq!(instants, vec![NaiveTime::from_hms_opt(8, 30, 15).unwrap()]);
    }

    #[test]
    fn test_parse_instants_rejects_garbage() {
        assert!(parse_instants("noon").is_err());
        assert!(parse_instants("").is_err());
    }

    #[test]
    fn test_parse_list_trims_and_drops_empties() {
        assert_eq!(
            parse_list("Alert_Timestamp, Time,,Hour "),
            vec!["Alert_Timestamp", "Time", "Hour"]
        );
    }
}
