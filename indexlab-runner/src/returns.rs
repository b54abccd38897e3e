//! Returns engine: pure transforms from a price table to derived tables.
//!
//! Every function here is table in, table out. Missing cells are never filled:
//! a return exists only where both endpoints are present in the same column.

use chrono::NaiveDate;
use indexlab_core::domain::{IndexSeries, MarketTable, TableColumn};
use serde::{Deserialize, Serialize};

/// Fixed trading-day approximation of one year.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// A rolling-window length expressed in trading days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Horizon {
    pub years: u32,
}

impl Horizon {
    pub fn years(years: u32) -> Self {
        Self { years }
    }

    /// `years * 252` rows, not calendar days.
    pub fn trading_days(&self) -> usize {
        self.years as usize * TRADING_DAYS_PER_YEAR
    }

    /// Display label, e.g. `1 Year`, `5 Years`.
    pub fn label(&self) -> String {
        if self.years == 1 {
            "1 Year".to_string()
        } else {
            format!("{} Years", self.years)
        }
    }
}

/// A table derived from a [`MarketTable`]: same dates, same column order.
///
/// Depending on the producer, values are simple returns (raw ratios), growth
/// factors, or rebased index levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnTable {
    dates: Vec<NaiveDate>,
    columns: Vec<TableColumn>,
}

impl ReturnTable {
    fn map_columns<F>(table: &MarketTable, f: F) -> Self
    where
        F: Fn(&[Option<f64>]) -> Vec<Option<f64>>,
    {
        Self {
            dates: table.dates().to_vec(),
            columns: table
                .columns()
                .iter()
                .map(|c| TableColumn {
                    name: c.name.clone(),
                    values: f(&c.values),
                })
                .collect(),
        }
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

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Present values of one column, in date order.
    pub fn valid(&self, name: &str) -> Vec<f64> {
        self.column(name)
            .map(|c| c.values.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Rows where every column has a value, as `(date, values in column order)`.
    pub fn complete_rows(&self) -> Vec<(NaiveDate, Vec<f64>)> {
        if self.columns.is_empty() {
            return Vec::new();
        }
        (0..self.dates.len())
            .filter_map(|row| {
                let values: Option<Vec<f64>> =
                    self.columns.iter().map(|c| c.values[row]).collect();
                values.map(|v| (self.dates[row], v))
            })
            .collect()
    }
}

fn pct_change(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i < periods {
                return None;
            }
            match (values[i - periods], values[i]) {
                (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
                _ => None,
            }
        })
        .collect()
}

/// Row-adjacent simple returns per column.
///
/// Row 0 is always absent, as is any row whose own or previous cell is absent.
pub fn daily_returns(table: &MarketTable) -> ReturnTable {
    ReturnTable::map_columns(table, |v| pct_change(v, 1))
}

/// Running product of `1 + r` over the present returns of each column.
///
/// Absent cells stay absent and do not reset the product.
pub fn cumulative_returns(daily: &ReturnTable) -> ReturnTable {
    let columns = daily
        .columns
        .iter()
        .map(|c| {
            let mut growth = 1.0;
            let values = c
                .values
                .iter()
                .map(|r| {
                    r.map(|r| {
                        growth *= 1.0 + r;
                        growth
                    })
                })
                .collect();
            TableColumn {
                name: c.name.clone(),
                values,
            }
        })
        .collect();
    ReturnTable {
        dates: daily.dates.clone(),
        columns,
    }
}

/// Return over `horizon_days` rows: `v[i] / v[i - h] - 1`, no fill.
pub fn rolling_returns(table: &MarketTable, horizon_days: usize) -> ReturnTable {
    ReturnTable::map_columns(table, |v| pct_change(v, horizon_days))
}

/// Each column rebased to 100 at its first present value.
pub fn normalized_performance(table: &MarketTable) -> ReturnTable {
    ReturnTable::map_columns(table, |v| {
        let base = v.iter().flatten().next().copied();
        v.iter()
            .map(|x| match (x, base) {
                (Some(x), Some(b)) => Some(x / b * 100.0),
                _ => None,
            })
            .collect()
    })
}

/// Cumulative growth of one index over its own observations.
///
/// Starts at the second observation; the value at each point equals
/// `close / first_close`.
pub fn series_cumulative_returns(series: &IndexSeries) -> Vec<(NaiveDate, f64)> {
    let mut growth = 1.0;
    series
        .daily_returns()
        .into_iter()
        .map(|(date, r)| {
            growth *= 1.0 + r;
            (date, growth)
        })
        .collect()
}

/// Pairwise Pearson correlations, indexed like `names`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Vec<Vec<f64>>,
    /// Number of complete rows the coefficients were computed over.
    pub observations: usize,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return f64::NAN;
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

/// Correlation of daily returns over rows where every index has a return.
pub fn correlation_matrix(daily: &ReturnTable) -> CorrelationMatrix {
    let rows = daily.complete_rows();
    let k = daily.columns.len();
    let series: Vec<Vec<f64>> = (0..k)
        .map(|j| rows.iter().map(|(_, v)| v[j]).collect())
        .collect();

    let values = (0..k)
        .map(|i| (0..k).map(|j| pearson(&series[i], &series[j])).collect())
        .collect();

    CorrelationMatrix {
        names: daily.names().into_iter().map(str::to_string).collect(),
        values,
        observations: rows.len(),
    }
}
