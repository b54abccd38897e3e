//! Analysis runner: wires loading, the returns engine and the timing simulator.
//!
//! Two entry points:
//! - `run_analysis()`: resolves the table (snapshot or fetch), then analyzes. Used by CLI.
//! - `analyze_table()`: pure computation over an already-loaded table.

use chrono::NaiveDate;
use indexlab_core::data::{DataProvider, RecoveredIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AnalysisConfig, ConfigError};
use crate::holding::{
    holding_period_stats, positive_return_probability, rolling_return_distributions,
    HoldingPeriodStat, PositiveProbability, RollingDistribution,
};
use crate::loader::{load_table, LoadError, LoadOptions, LoadedTable, TableOrigin};
use crate::returns::{
    correlation_matrix, cumulative_returns, daily_returns, normalized_performance,
    series_cumulative_returns, CorrelationMatrix, ReturnTable,
};
use crate::summary::{summary_statistics, IndexSummary};
use crate::timing::{timing_cost_for, TimingReport};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Result of the timing-cost step. A skip never aborts the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TimingOutcome {
    Completed(TimingReport),
    Skipped { index: String, reason: String },
}

/// An index that no source could serve, flattened for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub name: String,
    pub attempts: Vec<String>,
}

/// Growth of one index over its own observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesGrowth {
    pub index: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Everything one run computes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub origin: TableOrigin,
    pub fingerprint: String,
    pub row_count: usize,
    pub indices: Vec<String>,
    pub provenance: Vec<RecoveredIndex>,
    pub failed: Vec<FailedEntry>,
    pub truncated: Vec<String>,
    pub renamed: Vec<(String, String)>,
    pub has_synthetic: bool,
    pub summary: Vec<IndexSummary>,
    pub holding_periods: Vec<HoldingPeriodStat>,
    pub rolling_distributions: Vec<RollingDistribution>,
    pub positive_probability: Vec<PositiveProbability>,
    pub correlation: CorrelationMatrix,
    pub normalized: ReturnTable,
    pub cumulative: ReturnTable,
    pub series_growth: Vec<SeriesGrowth>,
    pub timing: TimingOutcome,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Resolve the table for `config` and analyze it.
pub fn run_analysis(
    config: &AnalysisConfig,
    primary: &dyn DataProvider,
    secondary: Option<&dyn DataProvider>,
    today: NaiveDate,
) -> Result<AnalysisResult, RunError> {
    config.validate()?;
    let end = config.end_date_or(today);
    let opts = LoadOptions {
        start: config.run.start_date,
        end,
        snapshot: config.run.snapshot.clone(),
        refresh: config.run.refresh,
        parallel: config.run.parallel,
    };
    let loaded = load_table(&opts, &config.catalogue(), primary, secondary)?;
    Ok(analyze_table(&loaded, config, config.run.start_date, end))
}

/// Compute every statistic for a loaded table. No I/O.
///
/// `start`/`end` are the requested range. A snapshot is used as-is, so for
/// snapshot tables the reported period is the table's own first and last date.
pub fn analyze_table(
    loaded: &LoadedTable,
    config: &AnalysisConfig,
    start: NaiveDate,
    end: NaiveDate,
) -> AnalysisResult {
    let table = &loaded.table;
    let (start, end) = match (loaded.origin, table.dates().first(), table.dates().last()) {
        (TableOrigin::Snapshot, Some(first), Some(last)) => (*first, *last),
        _ => (start, end),
    };
    info!(
        indices = table.column_count(),
        rows = table.row_count(),
        origin = ?loaded.origin,
        "analyzing market table"
    );

    let daily = daily_returns(table);
    let series_growth = table
        .names()
        .into_iter()
        .filter_map(|n| table.series(n))
        .map(|s| SeriesGrowth {
            index: s.name().to_string(),
            points: series_cumulative_returns(&s),
        })
        .collect();

    let timing = match timing_cost_for(
        table,
        &config.timing.index,
        config.timing.initial_investment,
        &config.timing.best_day_counts,
    ) {
        Ok(report) => TimingOutcome::Completed(report),
        Err(e) => {
            warn!(index = %config.timing.index, "timing-cost analysis skipped: {e}");
            TimingOutcome::Skipped {
                index: config.timing.index.clone(),
                reason: e.to_string(),
            }
        }
    };

    AnalysisResult {
        schema_version: SCHEMA_VERSION,
        start_date: start,
        end_date: end,
        origin: loaded.origin,
        fingerprint: table.fingerprint(),
        row_count: table.row_count(),
        indices: table.names().into_iter().map(str::to_string).collect(),
        provenance: loaded.recovered.clone(),
        failed: loaded
            .failed
            .iter()
            .map(|f| FailedEntry {
                name: f.name.clone(),
                attempts: f.attempts.iter().map(|a| a.to_string()).collect(),
            })
            .collect(),
        truncated: loaded
            .recovered
            .iter()
            .filter(|r| r.truncated)
            .map(|r| r.name.clone())
            .collect(),
        renamed: loaded.renamed.clone(),
        has_synthetic: loaded.has_synthetic(),
        summary: summary_statistics(table),
        holding_periods: holding_period_stats(table),
        rolling_distributions: rolling_return_distributions(table),
        positive_probability: positive_return_probability(table),
        correlation: correlation_matrix(&daily),
        normalized: normalized_performance(table),
        cumulative: cumulative_returns(&daily),
        series_growth,
        timing,
    }
}
