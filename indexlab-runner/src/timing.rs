//! Timing-cost simulator: what missing the best days would have cost.
//!
//! The baseline compounds every daily return. Each "Miss N Best" scenario
//! zeroes the N largest positive returns in place (the days stay in the
//! series, only their contribution is removed) and compounds again.

use crate::returns::TRADING_DAYS_PER_YEAR;
use indexlab_core::domain::{IndexSeries, MarketTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Minimum valid price observations before a simulation is meaningful.
pub const MIN_OBSERVATIONS: usize = 100;

/// Scenario counts used when none are configured.
pub const DEFAULT_BEST_DAY_COUNTS: [usize; 5] = [5, 10, 20, 30, 40];

pub const BASELINE_LABEL: &str = "Fully Invested";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TimingError {
    #[error("{name}: {observations} observations, need at least {required}")]
    InsufficientHistory {
        name: String,
        observations: usize,
        required: usize,
    },
}

/// Analysis requests against the merged table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("index '{name}' not found in table (available: {})", available.join(", "))]
    MissingColumn {
        name: String,
        available: Vec<String>,
    },

    #[error(transparent)]
    Timing(#[from] TimingError),
}

/// One counterfactual outcome. The baseline has `missed_days == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingScenario {
    pub label: String,
    pub missed_days: usize,
    pub final_value: f64,
    pub annualized_return_pct: f64,
    pub lost_amount: f64,
    pub lost_pct: f64,
}

/// Full simulation output for one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    pub index: String,
    pub initial_investment: f64,
    pub first_date: chrono::NaiveDate,
    pub last_date: chrono::NaiveDate,
    /// Number of daily returns compounded.
    pub return_days: usize,
    /// Baseline first, then ascending `missed_days`.
    pub scenarios: Vec<TimingScenario>,
}

impl TimingReport {
    pub fn baseline(&self) -> &TimingScenario {
        &self.scenarios[0]
    }
}

fn compound(initial: f64, returns: &[f64]) -> f64 {
    returns.iter().fold(initial, |acc, r| acc * (1.0 + r))
}

fn annualized_pct(final_value: f64, initial: f64, periods: usize) -> f64 {
    ((final_value / initial).powf(TRADING_DAYS_PER_YEAR as f64 / periods as f64) - 1.0) * 100.0
}

/// Indices of the `n` largest strictly positive returns.
///
/// Stable descending sort, so among equal returns the earlier day wins.
fn best_day_positions(returns: &[f64], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..returns.len()).collect();
    order.sort_by(|&a, &b| returns[b].total_cmp(&returns[a]));
    order
        .into_iter()
        .take_while(|&i| returns[i] > 0.0)
        .take(n)
        .collect()
}

/// Run the baseline and every "Miss N Best" scenario for one series.
pub fn simulate(
    series: &IndexSeries,
    initial_investment: f64,
    best_day_counts: &[usize],
) -> Result<TimingReport, TimingError> {
    let (first, last) = match (series.first(), series.last()) {
        (Some(f), Some(l)) if series.len() >= MIN_OBSERVATIONS => (f.date, l.date),
        _ => {
            return Err(TimingError::InsufficientHistory {
                name: series.name().to_string(),
                observations: series.len(),
                required: MIN_OBSERVATIONS,
            })
        }
    };

    let returns: Vec<f64> = series.daily_returns().into_iter().map(|(_, r)| r).collect();
    let n = returns.len();

    let mut counts = best_day_counts.to_vec();
    counts.sort_unstable();
    counts.dedup();

    let baseline_value = compound(initial_investment, &returns);
    let mut scenarios = vec![TimingScenario {
        label: BASELINE_LABEL.to_string(),
        missed_days: 0,
        final_value: baseline_value,
        annualized_return_pct: annualized_pct(baseline_value, initial_investment, n),
        lost_amount: 0.0,
        lost_pct: 0.0,
    }];

    let ranked = best_day_positions(&returns, counts.last().copied().unwrap_or(0));
    for count in counts.into_iter().filter(|c| *c > 0) {
        if count > ranked.len() {
            warn!(
                index = series.name(),
                requested = count,
                positive_days = ranked.len(),
                "fewer positive days than requested; zeroing all of them"
            );
        }
        let mut adjusted = returns.clone();
        for &i in ranked.iter().take(count) {
            adjusted[i] = 0.0;
        }
        let value = compound(initial_investment, &adjusted);
        let lost = baseline_value - value;
        scenarios.push(TimingScenario {
            label: format!("Miss {count} Best"),
            missed_days: count,
            final_value: value,
            annualized_return_pct: annualized_pct(value, initial_investment, n),
            lost_amount: lost,
            lost_pct: lost / baseline_value * 100.0,
        });
    }

    info!(
        index = series.name(),
        return_days = n,
        scenarios = scenarios.len(),
        "simulated timing cost"
    );

    Ok(TimingReport {
        index: series.name().to_string(),
        initial_investment,
        first_date: first,
        last_date: last,
        return_days: n,
        scenarios,
    })
}

/// Resolve `index_name` in the table and simulate it.
pub fn timing_cost_for(
    table: &MarketTable,
    index_name: &str,
    initial_investment: f64,
    best_day_counts: &[usize],
) -> Result<TimingReport, AnalysisError> {
    let series = table
        .series(index_name)
        .ok_or_else(|| AnalysisError::MissingColumn {
            name: index_name.to_string(),
            available: table.names().into_iter().map(str::to_string).collect(),
        })?;
    Ok(simulate(&series, initial_investment, best_day_counts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series_from_returns(name: &str, returns: &[f64]) -> IndexSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut price = 100.0;
        let mut pairs = vec![(start, price)];
        for (i, r) in returns.iter().enumerate() {
            price *= 1.0 + r;
            pairs.push((start + chrono::Duration::days(i as i64 + 1), price));
        }
        IndexSeries::from_pairs(name, &pairs)
    }

    #[test]
    fn short_series_is_declined() {
        let s = series_from_returns("Short", &[0.01; 98]);
        assert_eq!(s.len(), 99);
        assert_eq!(
            simulate(&s, 10_000.0, &DEFAULT_BEST_DAY_COUNTS),
            Err(TimingError::InsufficientHistory {
                name: "Short".into(),
                observations: 99,
                required: MIN_OBSERVATIONS,
            })
        );
    }

    #[test]
    fn counts_are_sorted_and_deduplicated() {
        let s = series_from_returns("X", &[0.001; 150]);
        let report = simulate(&s, 1000.0, &[10, 5, 10]).unwrap();
        let labels: Vec<&str> = report.scenarios.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Fully Invested", "Miss 5 Best", "Miss 10 Best"]);
        assert_eq!(report.baseline().lost_amount, 0.0);
    }

    #[test]
    fn ties_prefer_earlier_days() {
        let returns = [0.0, 0.05, 0.03, 0.05, -0.02];
        assert_eq!(best_day_positions(&returns, 1), vec![1]);
        assert_eq!(best_day_positions(&returns, 3), vec![1, 3, 2]);
    }

    #[test]
    fn only_positive_days_are_neutralized() {
        let returns = [-0.01, 0.02, -0.03];
        assert_eq!(best_day_positions(&returns, 3), vec![1]);
    }

    #[test]
    fn lost_pct_is_relative_to_baseline() {
        let mut returns = vec![0.0; 120];
        returns[10] = 0.1;
        let s = series_from_returns("X", &returns);
        let report = simulate(&s, 1000.0, &[5]).unwrap();
        let base = report.baseline().final_value;
        let miss = &report.scenarios[1];
        assert!((base - 1100.0).abs() < 1e-6);
        assert!((miss.final_value - 1000.0).abs() < 1e-9);
        assert!((miss.lost_amount - 100.0).abs() < 1e-6);
        assert!((miss.lost_pct - 100.0 / 1100.0 * 100.0).abs() < 1e-6);
    }

    #[test]
    fn missing_column_lists_available() {
        let s = series_from_returns("S&P 500 (US)", &[0.01; 5]);
        let table = MarketTable::from_series(vec![s]).unwrap();
        match timing_cost_for(&table, "Hang Seng (HK)", 1.0, &[5]) {
            Err(AnalysisError::MissingColumn { name, available }) => {
                assert_eq!(name, "Hang Seng (HK)");
                assert_eq!(available, vec!["S&P 500 (US)".to_string()]);
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }
}
