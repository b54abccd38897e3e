//! IndexLab Runner: returns engine, statistics, timing-cost simulation, reporting.
//!
//! This crate builds on `indexlab-core` to provide:
//! - Table loading with snapshot-or-fetch resolution
//! - Daily, cumulative and rolling returns, correlation, rebased performance
//! - Holding-period distributions and positive-return probability curves
//! - Summary statistics (total/annualized return, volatility, Sharpe, drawdown)
//! - "Miss the N best days" timing-cost scenarios
//! - TOML analysis configuration and CSV/JSON/Markdown artifact export

pub mod config;
pub mod export;
pub mod holding;
pub mod loader;
pub mod returns;
pub mod runner;
pub mod summary;
pub mod timing;

pub use config::{AnalysisConfig, ConfigError, RenderConfig, RunSection, TimingSection};
pub use export::{save_artifacts, Manifest};
pub use holding::{
    holding_period_stats, positive_return_probability, HoldingPeriodStat, PositiveProbability,
};
pub use loader::{load_table, LoadError, LoadOptions, LoadedTable, TableOrigin};
pub use returns::{
    correlation_matrix, cumulative_returns, daily_returns, normalized_performance,
    rolling_returns, series_cumulative_returns, CorrelationMatrix, Horizon, ReturnTable,
};
pub use runner::{analyze_table, run_analysis, AnalysisResult, RunError, TimingOutcome};
pub use summary::{max_drawdown, summary_statistics, IndexSummary};
pub use timing::{
    simulate, timing_cost_for, AnalysisError, TimingError, TimingReport, TimingScenario,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn result_types_are_send_sync() {
        assert_send::<AnalysisResult>();
        assert_sync::<AnalysisResult>();
        assert_send::<TimingReport>();
        assert_sync::<TimingReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<AnalysisConfig>();
        assert_sync::<AnalysisConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
        assert_send::<AnalysisError>();
        assert_sync::<AnalysisError>();
    }
}
