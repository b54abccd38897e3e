//! Date-aligned multi-index price table.
//!
//! Given series for several indices, align them to a common timeline (the union
//! of all dates). Missing cells stay absent: no forward-fill, no interpolation.

use super::series::{IndexSeries, PricePoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Structural errors when building or reshaping a table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("duplicate date {0}")]
    DuplicateDate(NaiveDate),

    #[error("dates are not sorted ascending at {0}")]
    UnsortedDates(NaiveDate),

    #[error("column '{name}' has {actual} values, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// One column of the table: an index name and a cell per table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl TableColumn {
    /// Number of present cells.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Row index of the first present cell.
    pub fn first_valid_row(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }

    /// Row index of the last present cell.
    pub fn last_valid_row(&self) -> Option<usize> {
        self.values.iter().rposition(Option::is_some)
    }
}

/// The merged table: rows are the union of dates, one column per index.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTable {
    dates: Vec<NaiveDate>,
    columns: Vec<TableColumn>,
}

impl MarketTable {
    /// A table with no rows and no columns.
    pub fn empty() -> Self {
        Self {
            dates: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Outer-join series on date. Column order follows the input order.
    pub fn from_series(series: Vec<IndexSeries>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for s in &series {
            if !seen.insert(s.name().to_string()) {
                return Err(TableError::DuplicateColumn(s.name().to_string()));
            }
        }

        let all_dates: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|s| s.points().iter().map(|p| p.date))
            .collect();
        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();
        let row_of: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let columns = series
            .iter()
            .map(|s| {
                let mut values = vec![None; dates.len()];
                for p in s.points() {
                    values[row_of[&p.date]] = Some(p.close);
                }
                TableColumn {
                    name: s.name().to_string(),
                    values,
                }
            })
            .collect();

        Ok(Self { dates, columns })
    }

    /// Build from pre-aligned columns, validating the table invariants.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<TableColumn>,
    ) -> Result<Self, TableError> {
        for w in dates.windows(2) {
            if w[1] == w[0] {
                return Err(TableError::DuplicateDate(w[1]));
            }
            if w[1] < w[0] {
                return Err(TableError::UnsortedDates(w[1]));
            }
        }
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.name.as_str()) {
                return Err(TableError::DuplicateColumn(c.name.clone()));
            }
            if c.values.len() != dates.len() {
                return Err(TableError::LengthMismatch {
                    name: c.name.clone(),
                    expected: dates.len(),
                    actual: c.values.len(),
                });
            }
        }
        Ok(Self { dates, columns })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Total rows, counting rows where a given column is absent.
    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when no index made it into the table.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The valid (non-missing) observations of one column as a series.
    pub fn series(&self, name: &str) -> Option<IndexSeries> {
        let col = self.column(name)?;
        let points = self
            .dates
            .iter()
            .zip(&col.values)
            .filter_map(|(d, v)| v.map(|close| PricePoint::new(*d, close)))
            .collect();
        Some(IndexSeries::new(name, points))
    }

    /// Rename columns through `rename`; names it returns `None` for are kept.
    ///
    /// Fails if two columns would end up with the same name.
    pub fn rename_columns<F>(mut self, rename: F) -> Result<Self, TableError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut seen = HashSet::new();
        for col in &mut self.columns {
            if let Some(new_name) = rename(&col.name) {
                col.name = new_name;
            }
            if !seen.insert(col.name.clone()) {
                return Err(TableError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(self)
    }

    /// Put the listed names first (in the given order), then every other column
    /// in its current order. Listed names that are absent are skipped.
    pub fn reorder(mut self, preferred: &[&str]) -> Self {
        let mut ordered = Vec::with_capacity(self.columns.len());
        for name in preferred {
            if let Some(pos) = self.columns.iter().position(|c| c.name == *name) {
                ordered.push(self.columns.remove(pos));
            }
        }
        ordered.append(&mut self.columns);
        self.columns = ordered;
        self
    }

    /// Deterministic BLAKE3 fingerprint over names, dates and value bits.
    ///
    /// Two tables with the same fingerprint are bit-identical.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for date in &self.dates {
            hasher.update(date.to_string().as_bytes());
        }
        for col in &self.columns {
            hasher.update(col.name.as_bytes());
            hasher.update(&[0xff]);
            for v in &col.values {
                match v {
                    Some(x) => {
                        hasher.update(&[1]);
                        hasher.update(&x.to_bits().to_le_bytes());
                    }
                    None => {
                        hasher.update(&[0]);
                    }
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
