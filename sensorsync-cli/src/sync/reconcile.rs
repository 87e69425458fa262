//! Idempotent reconciliation against the remote store
//!
//! Per destination kind: fetch what exists, index it by identity key, then
//! walk the candidates in order and create (or update) only what the index
//! does not already hold. Every per-record error becomes a counter; nothing
//! escapes this module as an `Err`.

use std::collections::HashMap;

use super::classify::{CandidateRecord, RecordKind};
use super::identity::{candidate_key, remote_key};
use crate::api::{RecordStore, record_sys_id};
use crate::config::{FieldSchema, Settings};

/// Outcome counters for one destination kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KindOutcome {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl KindOutcome {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }

    pub fn succeeded(&self) -> usize {
        self.created + self.updated + self.skipped
    }

    pub fn merge(&mut self, other: &KindOutcome) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Full run report.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncReport {
    pub events: KindOutcome,
    pub measurements: KindOutcome,
}

impl SyncReport {
    pub fn overall(&self) -> KindOutcome {
        let mut overall = self.events;
        overall.merge(&self.measurements);
        overall
    }

    /// A run is a hard failure only when records were attempted and none of
    /// them went through. Partial failure is still process-level success.
    pub fn is_hard_failure(&self) -> bool {
        let overall = self.overall();
        overall.failed > 0 && overall.succeeded() == 0
    }
}

/// Fetch the remote records of one kind and index them by identity key.
///
/// A transport failure degrades to an empty index: the run then treats every
/// candidate as new. The duplicate records that may cause are recoverable;
/// an aborted run is lost data.
async fn fetch_existing_index<S: RecordStore>(
    store: &S,
    kind: RecordKind,
    table: &str,
    schema: &FieldSchema,
    settings: &Settings,
) -> HashMap<String, String> {
    match store.list(table, settings.page_limit).await {
        Ok(records) => {
            let index: HashMap<String, String> = records
                .iter()
                .map(|record| {
                    (
                        remote_key(kind, record, schema),
                        record_sys_id(record).unwrap_or("").to_string(),
                    )
                })
                .collect();
            log::info!("Indexed {} existing {kind} record(s) from {table}", index.len());
            index
        }
        Err(err) => {
            log::warn!(
                "Could not list existing {kind} records from {table}: {err:#}; \
                 treating all candidates as new"
            );
            HashMap::new()
        }
    }
}

/// Reconcile one kind's candidates against its destination table.
pub async fn reconcile_kind<S: RecordStore>(
    store: &S,
    kind: RecordKind,
    table: &str,
    candidates: &[CandidateRecord],
    schema: &FieldSchema,
    settings: &Settings,
) -> KindOutcome {
    debug_assert!(candidates.iter().all(|c| c.kind() == kind));

    let mut outcome = KindOutcome::default();
    if candidates.is_empty() {
        return outcome;
    }

    let mut index = fetch_existing_index(store, kind, table, schema, settings).await;

    for candidate in candidates {
        let Some(key) = candidate_key(candidate) else {
            log::warn!(
                "Rejecting {kind} record without date/time: {}",
                candidate.describe()
            );
            outcome.failed += 1;
            continue;
        };

        if let Some(sys_id) = index.get(&key) {
            if settings.update_existing && !sys_id.is_empty() {
                let payload = candidate.to_payload(schema);
                match store.update(table, sys_id, &payload).await {
                    Ok(_) => outcome.updated += 1,
                    Err(err) => {
                        log::warn!("Failed to update {}: {err:#}", candidate.describe());
                        outcome.failed += 1;
                    }
                }
            } else {
                log::debug!("Skipping duplicate: {}", candidate.describe());
                outcome.skipped += 1;
            }
            continue;
        }

        let payload = candidate.to_payload(schema);
        match store.create(table, &payload).await {
            Ok(stored) => {
                outcome.created += 1;
                // Index the new record so an identical candidate later in
                // this run is skipped, not duplicated
                let sys_id = record_sys_id(&stored).unwrap_or("").to_string();
                index.insert(key, sys_id);
            }
            Err(err) => {
                log::warn!("Failed to create {}: {err:#}", candidate.describe());
                outcome.failed += 1;
            }
        }
    }

    log::info!(
        "{kind}: {} created, {} updated, {} skipped, {} failed",
        outcome.created,
        outcome.updated,
        outcome.skipped,
        outcome.failed
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::classify::MeasurementValue;
    use anyhow::{Result, bail};
    use serde_json::{Value, json};
    use std::cell::{Cell, RefCell};

    /// In-memory store: creates append to a table, list echoes what was
    /// stored, flags simulate transport failures.
    #[derive(Default)]
    struct MockStore {
        records: RefCell<HashMap<String, Vec<Value>>>,
        next_id: Cell<usize>,
        fail_list: Cell<bool>,
        fail_writes: Cell<bool>,
    }

    impl MockStore {
        fn stored(&self, table: &str) -> Vec<Value> {
            self.records.borrow().get(table).cloned().unwrap_or_default()
        }
    }

    impl RecordStore for MockStore {
        async fn list(&self, table: &str, _limit: u32) -> Result<Vec<Value>> {
            if self.fail_list.get() {
                bail!("connection reset by peer");
            }
            Ok(self.stored(table))
        }

        async fn create(&self, table: &str, data: &Value) -> Result<Value> {
            if self.fail_writes.get() {
                bail!("503 Service Unavailable");
            }
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            let mut stored = data.clone();
            stored["sys_id"] = json!(format!("sys-{id}"));
            self.records
                .borrow_mut()
                .entry(table.to_string())
                .or_default()
                .push(stored.clone());
            Ok(stored)
        }

        async fn update(&self, table: &str, sys_id: &str, data: &Value) -> Result<Value> {
            if self.fail_writes.get() {
                bail!("503 Service Unavailable");
            }
            let mut records = self.records.borrow_mut();
            let table_records = records.entry(table.to_string()).or_default();
            for record in table_records.iter_mut() {
                if record["sys_id"] == json!(sys_id) {
                    for (field, value) in data.as_object().unwrap() {
                        record[field] = value.clone();
                    }
                    return Ok(record.clone());
                }
            }
            bail!("no such record: {sys_id}");
        }
    }

    fn test_settings() -> Settings {
        Settings {
            instance: "dev".into(),
            username: "admin".into(),
            password: "secret".into(),
            event_table: "iot_alert_event".into(),
            measurement_table: "iot_sensor_log".into(),
            lookup_table: "iot_sensor_type".into(),
            alert_sheet_label: "Alerts".into(),
            target_instants: vec![chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap()],
            default_sensor_type: "unknown".into(),
            timestamp_columns: vec!["Timestamp".into()],
            page_limit: 10_000,
            request_timeout: std::time::Duration::from_secs(30),
            update_existing: false,
        }
    }

    fn event(time: &str, message: &str) -> CandidateRecord {
        CandidateRecord::Event {
            date: "2024-05-01".into(),
            time: time.into(),
            location: "Kitchen".into(),
            severity: "HIGH".into(),
            message: message.into(),
            sensor_type_id: "fall-01".into(),
        }
    }

    fn measurement(time: &str, value: &str) -> CandidateRecord {
        CandidateRecord::Measurement {
            date: "2024-05-01".into(),
            time: time.into(),
            location: "Bedroom".into(),
            sensor_type_id: "hum-01".into(),
            status: "OK".into(),
            is_active: true,
            value: MeasurementValue::Numeric(value.into()),
        }
    }

    #[tokio::test]
    async fn test_second_run_skips_everything() {
        let store = MockStore::default();
        let settings = test_settings();
        let schema = FieldSchema::default();
        let candidates = vec![
            event("12:03:00", "FALL_DETECTED"),
            event("20:10:00", "DOOR_LEFT_OPEN"),
            measurement("12:03:00", "23.5"),
        ];
        let events = &candidates[..2];
        let measurements = &candidates[2..];

        let first = reconcile_kind(
            &store,
            RecordKind::Event,
            "iot_alert_event",
            events,
            &schema,
            &settings,
        )
        .await;
        assert_eq!(first.created, 2);
        assert_eq!(first.skipped, 0);

        let first = reconcile_kind(
            &store,
            RecordKind::Measurement,
            "iot_sensor_log",
            measurements,
            &schema,
            &settings,
        )
        .await;
        assert_eq!(first.created, 1);

        // Same source data again: nothing new
        let second = reconcile_kind(
            &store,
            RecordKind::Event,
            "iot_alert_event",
            events,
            &schema,
            &settings,
        )
        .await;
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.stored("iot_alert_event").len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_within_one_run_is_skipped() {
        let store = MockStore::default();
        let candidates = vec![event("12:03:00", "FALL_DETECTED"); 2];
        let outcome = reconcile_kind(
            &store,
            RecordKind::Event,
            "iot_alert_event",
            &candidates,
            &FieldSchema::default(),
            &test_settings(),
        )
        .await;
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(store.stored("iot_alert_event").len(), 1);
    }

    #[tokio::test]
    async fn test_list_failure_degrades_to_empty_index() {
        let store = MockStore::default();
        store.fail_list.set(true);
        let candidates = vec![event("12:03:00", "FALL_DETECTED"), event("20:10:00", "X")];
        let outcome = reconcile_kind(
            &store,
            RecordKind::Event,
            "iot_alert_event",
            &candidates,
            &FieldSchema::default(),
            &test_settings(),
        )
        .await;
        // Run completes; everything is treated as new
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.failed, 0);
    }

    #[tokio::test]
    async fn test_missing_date_or_time_counts_failed() {
        let store = MockStore::default();
        let candidates = vec![event("", "FALL_DETECTED"), event("12:03:00", "OK_ALERT")];
        let outcome = reconcile_kind(
            &store,
            RecordKind::Event,
            "iot_alert_event",
            &candidates,
            &FieldSchema::default(),
            &test_settings(),
        )
        .await;
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.created, 1);
        assert_eq!(store.stored("iot_alert_event").len(), 1);
    }

    #[tokio::test]
    async fn test_update_variant_patches_matches() {
        let store = MockStore::default();
        let mut settings = test_settings();
        let schema = FieldSchema::default();
        let candidates = vec![event("12:03:00", "FALL_DETECTED")];

        reconcile_kind(
            &store,
            RecordKind::Event,
            "iot_alert_event",
            &candidates,
            &schema,
            &settings,
        )
        .await;

        settings.update_existing = true;
        let outcome = reconcile_kind(
            &store,
            RecordKind::Event,
            "iot_alert_event",
            &candidates,
            &schema,
            &settings,
        )
        .await;
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.created, 0);
        assert_eq!(store.stored("iot_alert_event").len(), 1);
    }

    #[tokio::test]
    async fn test_write_failures_count_but_do_not_abort() {
        let store = MockStore::default();
        store.fail_writes.set(true);
        let candidates = vec![
            event("12:03:00", "A"),
            event("12:04:00", "B"),
            event("12:05:00", "C"),
        ];
        let outcome = reconcile_kind(
            &store,
            RecordKind::Event,
            "iot_alert_event",
            &candidates,
            &FieldSchema::default(),
            &test_settings(),
        )
        .await;
        assert_eq!(outcome.failed, 3);
        assert_eq!(outcome.created, 0);
    }

    #[test]
    fn test_hard_failure_requires_total_failure() {
        let mut report = SyncReport::default();
        report.events.failed = 2;
        report.events.created = 3;
        assert!(!report.is_hard_failure());

        let mut report = SyncReport::default();
        report.events.failed = 5;
        assert!(report.is_hard_failure());

        // Nothing attempted at all is not a failure
        assert!(!SyncReport::default().is_hard_failure());

        // Skips alone are success
        let mut report = SyncReport::default();
        report.measurements.skipped = 4;
        report.measurements.failed = 1;
        assert!(!report.is_hard_failure());
    }
}
