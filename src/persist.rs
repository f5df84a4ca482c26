use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde_json::Value;
use tracing::info;

use crate::flatten::FlatRecord;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<source>_review_page_<n>_<timestamp>.json`
pub fn raw_page_file_name(source: &str, page: u32, ts: DateTime<Local>) -> String {
    format!(
        "{}_review_page_{}_{}.json",
        source,
        page,
        ts.format(STAMP_FORMAT)
    )
}

/// `<source>_review_<timestamp>.csv`
pub fn csv_file_name(source: &str, ts: DateTime<Local>) -> String {
    format!("{}_review_{}.csv", source, ts.format(STAMP_FORMAT))
}

/// Write one raw page payload verbatim, as an audit trail independent of
/// flattening. IO failure is fatal.
pub fn save_raw_page(dir: &Path, source: &str, page: u32, body: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
    let path = dir.join(raw_page_file_name(source, page, Local::now()));
    fs::write(&path, body)
        .with_context(|| format!("Failed to write raw page to {}", path.display()))?;
    info!("Raw page {} saved to {}", page, path.display());
    Ok(path)
}

/// Write the batch as CSV: one row per record, header is the union of fields
/// across all records in first-seen order, plus a trailing `date` column
/// holding the retrieval timestamp on every row. Missing fields and explicit
/// nulls render as empty cells.
pub fn write_csv(batch: &[FlatRecord], path: &Path, retrieved_at: DateTime<Utc>) -> Result<()> {
    let mut columns: Vec<&str> = Vec::new();
    for record in batch {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;

    let mut header: Vec<&str> = columns.clone();
    header.push("date");
    writer.write_record(&header)?;

    let stamp = retrieved_at.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    for record in batch {
        let mut row: Vec<String> = columns
            .iter()
            .map(|col| record.get(*col).map(cell).unwrap_or_default())
            .collect();
        row.push(stamp.clone());
        writer.write_record(&row)?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    info!("{} records flattened and saved to {}", batch.len(), path.display());
    Ok(())
}

/// Derive a human-readable datetime column from an epoch-seconds field,
/// writing `dest` on every record. Absent or unparseable seconds become an
/// explicit Null (empty cell), never a write failure. The Play API serializes
/// int64 as a JSON string, so both representations are accepted.
pub fn add_datetime_column(batch: &mut [FlatRecord], seconds_field: &str, dest: &str) {
    for record in batch.iter_mut() {
        let derived = record
            .get(seconds_field)
            .and_then(epoch_seconds)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null);
        record.insert(dest.to_string(), derived);
    }
}

fn epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Composite values captured verbatim by a direct rule
        other => other.to_string(),
    }
}

// ── Tests ──
