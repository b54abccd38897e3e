//! Snapshot persistence for the merged market table.
//!
//! Layout: CSV with a `snapshot_date` first column and one column per index
//! display name. Absent cells are empty, never zero. Columns are written in
//! region order (see [`column_order`]) with unknown columns appended.
//!
//! Loading upgrades legacy bare column names (`FTSE 100`) to the current
//! convention (`FTSE 100 (UK)`) before anything else sees the table.
//! Writes are atomic: write to `.tmp`, then rename into place.

use super::catalogue::{column_order, upgrade_legacy_name, IndexSpec};
use crate::domain::{MarketTable, TableColumn, TableError};
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Header of the date column.
pub const DATE_COLUMN: &str = "snapshot_date";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("snapshot CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("snapshot has no header row")]
    MissingHeader,

    #[error("line {line}: invalid date '{value}'")]
    BadDate { line: u64, value: String },

    #[error("line {line}, column '{column}': invalid price '{value}'")]
    BadValue {
        line: u64,
        column: String,
        value: String,
    },

    #[error("snapshot table is invalid: {0}")]
    Table(#[from] TableError),
}

/// A loaded snapshot and the legacy renames applied to it.
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub table: MarketTable,
    pub renamed: Vec<(String, String)>,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // Timestamps written as "YYYY-MM-DD 00:00:00" are accepted too.
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
}

/// Read a snapshot from any reader.
pub fn read_snapshot<R: io::Read>(reader: R) -> Result<LoadedSnapshot, SnapshotError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(SnapshotError::MissingHeader);
    }
    let names: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut dates = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let raw_date = record.get(0).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| SnapshotError::BadDate {
            line,
            value: raw_date.to_string(),
        })?;
        dates.push(date);

        for (i, name) in names.iter().enumerate() {
            let cell = record.get(i + 1).unwrap_or("").trim();
            let value = if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                None
            } else {
                Some(cell.parse::<f64>().map_err(|_| SnapshotError::BadValue {
                    line,
                    column: name.clone(),
                    value: cell.to_string(),
                })?)
            };
            values[i].push(value);
        }
    }

    let columns = names
        .into_iter()
        .zip(values)
        .map(|(name, values)| TableColumn { name, values })
        .collect();
    let table = MarketTable::from_columns(dates, columns)?;

    let mut renamed = Vec::new();
    for name in table.names() {
        if let Some(new) = upgrade_legacy_name(name) {
            renamed.push((name.to_string(), new.to_string()));
        }
    }
    let table = table.rename_columns(|n| upgrade_legacy_name(n).map(str::to_string))?;

    Ok(LoadedSnapshot { table, renamed })
}

/// Load a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<LoadedSnapshot, SnapshotError> {
    let file = fs::File::open(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = read_snapshot(file)?;
    if !loaded.renamed.is_empty() {
        info!(
            path = %path.display(),
            columns = loaded.renamed.len(),
            "upgraded legacy snapshot column names"
        );
    }
    info!(
        path = %path.display(),
        indices = loaded.table.column_count(),
        rows = loaded.table.row_count(),
        "loaded snapshot"
    );
    Ok(loaded)
}

/// Write a table as snapshot CSV, columns in the given table order.
pub fn write_snapshot<W: io::Write>(table: &MarketTable, writer: W) -> Result<(), SnapshotError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![DATE_COLUMN.to_string()];
    header.extend(table.names().into_iter().map(str::to_string));
    wtr.write_record(&header)?;

    for (row, date) in table.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(table.column_count() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        for col in table.columns() {
            // Display for f64 is shortest round-trip, so reloads are bit-identical.
            record.push(col.values[row].map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|source| SnapshotError::Io {
        path: PathBuf::from("<writer>"),
        source,
    })?;
    Ok(())
}

/// Reorder the table into snapshot column order and write it atomically.
pub fn save_snapshot(
    table: &MarketTable,
    path: &Path,
    catalogue: &[IndexSpec],
) -> Result<MarketTable, SnapshotError> {
    let order = column_order(catalogue);
    let order_refs: Vec<&str> = order.iter().map(String::as_str).collect();
    let ordered = table.clone().reorder(&order_refs);

    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    let file = fs::File::create(&tmp_path).map_err(io_err)?;
    write_snapshot(&ordered, io::BufWriter::new(file))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(e)
    })?;

    info!(path = %path.display(), indices = ordered.column_count(), "saved snapshot");
    Ok(ordered)
}

/// Rewrite a snapshot in place with upgraded column names and canonical order.
///
/// Returns the renames that were applied.
pub fn migrate_snapshot(
    path: &Path,
    catalogue: &[IndexSpec],
) -> Result<Vec<(String, String)>, SnapshotError> {
    let loaded = load_snapshot(path)?;
    save_snapshot(&loaded.table, path, catalogue)?;
    Ok(loaded.renamed)
}
