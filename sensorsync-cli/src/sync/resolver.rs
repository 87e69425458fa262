//! Sheet-name to sensor-type resolution
//!
//! Sensor-type metadata lives in a remote lookup table. It is fetched once
//! per run into a read-only cache; record mapping never waits on the network
//! after that.

use crate::api::{RecordStore, field_str, record_sys_id};
use crate::config::Settings;

/// Read-only cache of (name, id) lookup entries plus the fallback id.
pub struct SensorTypeResolver {
    entries: Vec<(String, String)>,
    default_id: String,
}

impl SensorTypeResolver {
    /// Resolver with no lookup entries; every sheet maps to the default id.
    pub fn with_default(default_id: &str) -> Self {
        Self {
            entries: Vec::new(),
            default_id: default_id.to_string(),
        }
    }

    /// Populate the cache from the remote lookup table. A failed fetch
    /// degrades to the default-only resolver.
    pub async fn load<S: RecordStore>(store: &S, settings: &Settings) -> Self {
        match store.list(&settings.lookup_table, settings.page_limit).await {
            Ok(records) => {
                let entries: Vec<(String, String)> = records
                    .iter()
                    .filter_map(|record| {
                        let name = field_str(record, "name").trim();
                        if name.is_empty() {
                            return None;
                        }
                        let id = record_sys_id(record)?;
                        Some((name.to_string(), id.to_string()))
                    })
                    .collect();
                log::info!(
                    "Loaded {} sensor type(s) from {}",
                    entries.len(),
                    settings.lookup_table
                );
                Self {
                    entries,
                    default_id: settings.default_sensor_type.clone(),
                }
            }
            Err(err) => {
                log::warn!(
                    "Sensor type lookup unavailable ({err:#}); using default id '{}'",
                    settings.default_sensor_type
                );
                Self::with_default(&settings.default_sensor_type)
            }
        }
    }

    /// Resolve a sheet name to a sensor-type id: exact name, then
    /// case-insensitive name, then the motion-family substring rule, then
    /// the default.
    pub fn resolve(&self, sheet_name: &str) -> &str {
        let name = sheet_name.trim();

        if let Some((_, id)) = self.entries.iter().find(|(n, _)| n == name) {
            return id;
        }

        if let Some((_, id)) = self
            .entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            return id;
        }

        // Motion sensors are logged per zone ("Motion_Hallway", "Motion_2")
        // but share a single lookup entry
        let lowered = name.to_lowercase();
        if lowered.contains("motion") {
            if let Some((_, id)) = self
                .entries
                .iter()
                .find(|(n, _)| n.to_lowercase().contains("motion"))
            {
                return id;
            }
        }

        &self.default_id
    }
}
