//! Time-windowed row sampling
//!
//! Periodic sensor channels log far more often than the destination store
//! needs. For each calendar day the sampler keeps the first row at or after
//! each configured target instant and drops the rest.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, HashMap};

use super::classify::{DATE_COLUMNS, first_present};
use crate::config::Settings;
use crate::source::SheetRow;
use crate::sync::normalize::normalize_cell;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Sampled rows plus whether the sampler had to give up and pass everything
/// through.
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub rows: Vec<SheetRow>,
    pub degraded: bool,
}

/// Parse a row's timestamp from the configured columns: either a combined
/// date+time value, or a time-of-day combined with the row's date column.
fn row_timestamp(row: &SheetRow, timestamp_columns: &[String]) -> Option<NaiveDateTime> {
    let column_refs: Vec<&str> = timestamp_columns.iter().map(String::as_str).collect();
    let raw = normalize_cell(first_present(row, &column_refs)?);
    if raw.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(&raw, format) {
            return Some(ts);
        }
    }

    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(&raw, format) {
            return Some(row_date(row)?.and_time(time));
        }
    }

    None
}

fn row_date(row: &SheetRow) -> Option<NaiveDate> {
    let raw = normalize_cell(first_present(row, DATE_COLUMNS)?);
    if raw.is_empty() {
        return None;
    }
    // Date cells exported as datetimes carry the day in the first 10 chars
    let prefix = raw.get(..10).unwrap_or(raw.as_str());
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, format) {
            return Some(date);
        }
    }
    None
}

/// Select the first row at or after each target instant, per calendar day.
///
/// Rows without a parseable timestamp are dropped. If no row parses at all
/// the sheet degrades to passing through unfiltered; a data problem must
/// never cost the whole sheet. A row cannot satisfy two windows: a candidate
/// whose timestamp equals that day's previous selection is passed over.
///
/// Output order is by target instant, then by date, not the source order.
pub fn sample(rows: &[SheetRow], sheet_name: &str, settings: &Settings) -> SampleResult {
    if rows.is_empty() {
        return SampleResult {
            rows: Vec::new(),
            degraded: false,
        };
    }

    let mut stamped: Vec<(NaiveDateTime, &SheetRow)> = rows
        .iter()
        .filter_map(|row| row_timestamp(row, &settings.timestamp_columns).map(|ts| (ts, row)))
        .collect();

    if stamped.is_empty() {
        log::warn!(
            "Sheet '{sheet_name}': no parseable timestamps in columns {:?}, keeping all {} rows",
            settings.timestamp_columns,
            rows.len()
        );
        return SampleResult {
            rows: rows.to_vec(),
            degraded: true,
        };
    }

    let dropped = rows.len() - stamped.len();
    if dropped > 0 {
        log::warn!("Sheet '{sheet_name}': dropped {dropped} row(s) without a parseable timestamp");
    }

    stamped.sort_by_key(|(ts, _)| *ts);

    let mut by_date: BTreeMap<NaiveDate, Vec<(NaiveDateTime, &SheetRow)>> = BTreeMap::new();
    for (ts, row) in stamped {
        by_date.entry(ts.date()).or_default().push((ts, row));
    }

    let mut selected = Vec::new();
    let mut last_selected: HashMap<NaiveDate, NaiveDateTime> = HashMap::new();

    for instant in &settings.target_instants {
        for (date, day_rows) in &by_date {
            let previous = last_selected.get(date);
            let pick = day_rows
                .iter()
                .find(|(ts, _)| ts.time() >= *instant && previous != Some(ts));
            if let Some((ts, row)) = pick {
                selected.push((*row).clone());
                last_selected.insert(*date, *ts);
            }
        }
    }

    SampleResult {
        rows: selected,
        degraded: false,
    }
}
