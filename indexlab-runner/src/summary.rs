//! Summary statistics: one row of return/risk figures per index.
//!
//! Each figure is a pure function over a slice of prices or returns.
//! Percent-scale outputs are multiplied by 100; the Sharpe ratio is a raw ratio.

use crate::returns::{daily_returns, TRADING_DAYS_PER_YEAR};
use chrono::NaiveDate;
use indexlab_core::domain::MarketTable;
use serde::{Deserialize, Serialize};

/// Summary row for one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub name: String,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub annualized_volatility_pct: f64,
    /// NaN when fewer than two returns exist or their deviation is zero.
    pub sharpe: f64,
    pub max_drawdown_pct: f64,
    pub best_day_pct: f64,
    pub worst_day_pct: f64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub trading_days: usize,
}

/// Summary rows for every column, in table order.
///
/// The annualization exponent is `252 / table.row_count()` for every column,
/// including columns with shorter history than the table.
pub fn summary_statistics(table: &MarketTable) -> Vec<IndexSummary> {
    let daily = daily_returns(table);
    let rows = table.row_count();

    table
        .columns()
        .iter()
        .map(|col| {
            let prices: Vec<f64> = col.values.iter().flatten().copied().collect();
            let returns = daily.valid(&col.name);
            let ratio = price_ratio(&prices);

            IndexSummary {
                name: col.name.clone(),
                total_return_pct: (ratio - 1.0) * 100.0,
                annualized_return_pct: annualized_return(ratio, rows) * 100.0,
                annualized_volatility_pct: std_dev(&returns)
                    * (TRADING_DAYS_PER_YEAR as f64).sqrt()
                    * 100.0,
                sharpe: sharpe_ratio(&returns),
                max_drawdown_pct: max_drawdown(&prices) * 100.0,
                best_day_pct: extreme(&returns, f64::max) * 100.0,
                worst_day_pct: extreme(&returns, f64::min) * 100.0,
                first_date: col.first_valid_row().map(|r| table.dates()[r]),
                last_date: col.last_valid_row().map(|r| table.dates()[r]),
                trading_days: prices.len(),
            }
        })
        .collect()
}

/// `last / first` over present prices; NaN when there are none.
fn price_ratio(prices: &[f64]) -> f64 {
    match (prices.first(), prices.last()) {
        (Some(first), Some(last)) if *first > 0.0 => last / first,
        _ => f64::NAN,
    }
}

/// `ratio^(252 / periods) - 1`.
pub fn annualized_return(ratio: f64, periods: usize) -> f64 {
    if periods == 0 {
        return f64::NAN;
    }
    ratio.powf(TRADING_DAYS_PER_YEAR as f64 / periods as f64) - 1.0
}

/// Annualized Sharpe ratio with a zero risk-free rate.
///
/// `mean / std * sqrt(252)`; NaN when undefined rather than a silent zero.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    let std = std_dev(returns);
    if std == 0.0 || !std.is_finite() {
        return f64::NAN;
    }
    mean_f64(returns) / std * (TRADING_DAYS_PER_YEAR as f64).sqrt()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 for constant or non-decreasing prices and NaN for no prices.
pub fn max_drawdown(prices: &[f64]) -> f64 {
    let mut peak = match prices.first() {
        Some(p) => *p,
        None => return f64::NAN,
    };
    let mut max_dd = 0.0_f64;

    for &p in prices {
        if p > peak {
            peak = p;
        }
        if peak > 0.0 {
            let dd = (p - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

fn extreme(values: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    values.iter().copied().reduce(pick).unwrap_or(f64::NAN)
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1); NaN below two values.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
