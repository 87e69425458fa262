//! The sync engine
//!
//! sheets -> window sampling (per sheet kind) -> classification/mapping ->
//! candidate records -> reconciliation against the remote store.

pub mod classify;
pub mod identity;
pub mod normalize;
pub mod reconcile;
pub mod resolver;
pub mod sampler;

pub use classify::{CandidateRecord, MeasurementValue, RecordKind};
pub use reconcile::{KindOutcome, SyncReport};

use crate::api::RecordStore;
use crate::config::{FieldSchema, Settings};
use crate::source::Sheet;
use classify::{classify, map_to_record};
use reconcile::reconcile_kind;
use resolver::SensorTypeResolver;
use sampler::sample;

/// Turn the workbook's sheets into per-kind candidate lists, preserving
/// sheet order and, within a sheet, sampling/classification order.
pub fn collect_candidates(
    sheets: &[Sheet],
    resolver: &SensorTypeResolver,
    settings: &Settings,
) -> (Vec<CandidateRecord>, Vec<CandidateRecord>) {
    let mut events = Vec::new();
    let mut measurements = Vec::new();

    for sheet in sheets {
        if sheet.rows.is_empty() {
            log::debug!("Skipping empty sheet '{}'", sheet.name);
            continue;
        }

        let kind = classify(&sheet.name, &settings.alert_sheet_label);
        // Alert events are sparse and each one matters; only the periodic
        // sensor channels are thinned to the daily windows.
        let rows = match kind {
            RecordKind::Event => sheet.rows.clone(),
            RecordKind::Measurement => {
                let sampled = sample(&sheet.rows, &sheet.name, settings);
                if sampled.degraded {
                    log::debug!("Sheet '{}' syncs unsampled", sheet.name);
                }
                sampled.rows
            }
        };

        let sensor_type_id = resolver.resolve(&sheet.name).to_string();
        let target = match kind {
            RecordKind::Event => &mut events,
            RecordKind::Measurement => &mut measurements,
        };

        let before = target.len();
        for row in &rows {
            if let Some(candidate) = map_to_record(row, kind, &sensor_type_id, settings) {
                target.push(candidate);
            }
        }
        log::info!(
            "Sheet '{}': {} of {} sampled row(s) mapped to {kind} records",
            sheet.name,
            target.len() - before,
            rows.len()
        );
    }

    (events, measurements)
}

/// Run one full sync pass. Never returns an error: everything after startup
/// configuration degrades into the report's counters.
pub async fn run_sync<S: RecordStore>(
    sheets: &[Sheet],
    store: &S,
    settings: &Settings,
    schema: &FieldSchema,
) -> SyncReport {
    let resolver = SensorTypeResolver::load(store, settings).await;
    let (events, measurements) = collect_candidates(sheets, &resolver, settings);

    if events.is_empty() && measurements.is_empty() {
        log::info!("No records to sync");
        return SyncReport::default();
    }

    let events_outcome = reconcile_kind(
        store,
        RecordKind::Event,
        &settings.event_table,
        &events,
        schema,
        settings,
    )
    .await;

    let measurements_outcome = reconcile_kind(
        store,
        RecordKind::Measurement,
        &settings.measurement_table,
        &measurements,
        schema,
        settings,
    )
    .await;

    SyncReport {
        events: events_outcome,
        measurements: measurements_outcome,
    }
}
