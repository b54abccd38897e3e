//! Holding-period analysis over rolling multi-year windows.

use crate::returns::{rolling_returns, Horizon};
use crate::summary::{mean_f64, std_dev};
use chrono::NaiveDate;
use indexlab_core::domain::MarketTable;
use serde::{Deserialize, Serialize};

/// Horizons reported in the holding-period table, in years.
pub const HOLDING_HORIZONS: [u32; 6] = [1, 3, 5, 10, 15, 20];

/// Horizons of the positive-probability curve, in years.
pub const PROBABILITY_HORIZONS: std::ops::RangeInclusive<u32> = 1..=20;

/// Distribution of rolling returns for one index and horizon, in percent.
///
/// Every field is NaN when the index has no complete window of this length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingPeriodStat {
    pub index: String,
    pub horizon: Horizon,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub positive_pct: f64,
    pub windows: usize,
}

impl HoldingPeriodStat {
    fn from_windows(index: &str, horizon: Horizon, windows: &[f64]) -> Self {
        if windows.is_empty() {
            return Self {
                index: index.to_string(),
                horizon,
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                positive_pct: f64::NAN,
                windows: 0,
            };
        }
        Self {
            index: index.to_string(),
            horizon,
            mean: mean_f64(windows) * 100.0,
            std: std_dev(windows) * 100.0,
            min: windows.iter().copied().fold(f64::INFINITY, f64::min) * 100.0,
            max: windows.iter().copied().fold(f64::NEG_INFINITY, f64::max) * 100.0,
            positive_pct: positive_fraction(windows) * 100.0,
            windows: windows.len(),
        }
    }
}

fn positive_fraction(windows: &[f64]) -> f64 {
    windows.iter().filter(|r| **r > 0.0).count() as f64 / windows.len() as f64
}

/// Stats for every index at every horizon in `horizons`, horizon-major.
pub fn holding_period_stats_for(table: &MarketTable, horizons: &[u32]) -> Vec<HoldingPeriodStat> {
    let mut out = Vec::with_capacity(horizons.len() * table.column_count());
    for &years in horizons {
        let horizon = Horizon::years(years);
        let rolling = rolling_returns(table, horizon.trading_days());
        for name in rolling.names() {
            out.push(HoldingPeriodStat::from_windows(
                name,
                horizon,
                &rolling.valid(name),
            ));
        }
    }
    out
}

/// Stats over the standard 1/3/5/10/15/20-year horizons.
pub fn holding_period_stats(table: &MarketTable) -> Vec<HoldingPeriodStat> {
    holding_period_stats_for(table, &HOLDING_HORIZONS)
}

/// Every rolling-window return of one index at one horizon.
///
/// Feeds the return-distribution histograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingDistribution {
    pub index: String,
    pub horizon: Horizon,
    /// `(window end date, return in percent)`, in date order.
    pub windows: Vec<(NaiveDate, f64)>,
}

/// Rolling-window returns over the standard holding horizons, horizon-major.
pub fn rolling_return_distributions(table: &MarketTable) -> Vec<RollingDistribution> {
    let mut out = Vec::with_capacity(HOLDING_HORIZONS.len() * table.column_count());
    for years in HOLDING_HORIZONS {
        let horizon = Horizon::years(years);
        let rolling = rolling_returns(table, horizon.trading_days());
        for col in rolling.columns() {
            let windows = rolling
                .dates()
                .iter()
                .zip(&col.values)
                .filter_map(|(date, v)| v.map(|r| (*date, r * 100.0)))
                .collect();
            out.push(RollingDistribution {
                index: col.name.clone(),
                horizon,
                windows,
            });
        }
    }
    out
}

/// Probability of a positive return for each holding period of 1..=20 years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositiveProbability {
    pub index: String,
    /// `(years, percent)`; percent is NaN when no window exists.
    pub points: Vec<(u32, f64)>,
}

/// Positive-return probability curve per index, in table column order.
pub fn positive_return_probability(table: &MarketTable) -> Vec<PositiveProbability> {
    let mut curves: Vec<PositiveProbability> = table
        .names()
        .into_iter()
        .map(|n| PositiveProbability {
            index: n.to_string(),
            points: Vec::new(),
        })
        .collect();

    for years in PROBABILITY_HORIZONS {
        let rolling = rolling_returns(table, Horizon::years(years).trading_days());
        for curve in &mut curves {
            let windows = rolling.valid(&curve.index);
            let pct = if windows.is_empty() {
                f64::NAN
            } else {
                positive_fraction(&windows) * 100.0
            };
            curve.points.push((years, pct));
        }
    }
    curves
}
