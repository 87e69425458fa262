//! Workbook loading
//!
//! Reads every named sheet of an `.xlsx` file into header-keyed rows. The
//! first row of each sheet is treated as the header row; cells are converted
//! to JSON values so the rest of the engine never sees calamine types.

use anyhow::{Context, Result};
use calamine::{Data, Reader, Xlsx, open_workbook};
use serde_json::{Map, Value, json};
use std::path::Path;

/// One row of one sheet: ordered column name -> cell value.
pub type SheetRow = Map<String, Value>;

/// A named sheet and its data rows.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<SheetRow>,
}

/// Convert an Excel cell to a JSON value.
fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => json!(*i),
        Data::Float(f) => {
            // Whole numbers come back from Excel as floats
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                json!(*f as i64)
            } else {
                json!(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) => Value::String(s.clone()),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

/// Read all named sheets from a workbook.
pub fn load_workbook<P: AsRef<Path>>(path: P) -> Result<Vec<Sheet>> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::new();

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {sheet_name}"))?;

        let mut row_iter = range.rows();
        let headers: Vec<String> = match row_iter.next() {
            Some(header_row) => header_row
                .iter()
                .map(|c| match c {
                    Data::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .collect(),
            None => {
                sheets.push(Sheet {
                    name: sheet_name,
                    rows: Vec::new(),
                });
                continue;
            }
        };

        let mut rows = Vec::new();
        for row in row_iter {
            let mut record = Map::new();
            for (col_idx, cell) in row.iter().enumerate() {
                let header = headers.get(col_idx).map(|s| s.as_str()).unwrap_or("");
                if header.is_empty() {
                    continue;
                }
                record.insert(header.to_string(), cell_to_value(cell));
            }
            // Skip rows with no data at all
            if record.values().all(Value::is_null) {
                continue;
            }
            rows.push(record);
        }

        sheets.push(Sheet {
            name: sheet_name,
            rows,
        });
    }

    Ok(sheets)
}
