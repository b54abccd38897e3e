//! End-to-end scenarios for the analysis pipeline.
//!
//! Tables are built in memory or from synthetic providers; nothing touches
//! the network.

use chrono::NaiveDate;
use indexlab_core::data::{read_snapshot, SyntheticProvider};
use indexlab_core::domain::{IndexSeries, MarketTable};
use indexlab_runner::export::{
    load_manifest, TimingStatus, MANIFEST_FILE, ROLLING_FILE, TIMING_FILE,
};
use indexlab_runner::{
    analyze_table, correlation_matrix, daily_returns, run_analysis, save_artifacts, simulate,
    summary_statistics, timing_cost_for, AnalysisConfig, AnalysisError, LoadedTable,
    TableOrigin, TimingError, TimingOutcome,
};

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap() + chrono::Duration::days(i as i64)
}

fn series_from_returns(name: &str, first_day: usize, returns: &[f64]) -> IndexSeries {
    let mut price = 100.0;
    let mut pairs = vec![(day(first_day), price)];
    for (i, r) in returns.iter().enumerate() {
        price *= 1.0 + r;
        pairs.push((day(first_day + i + 1), price));
    }
    IndexSeries::from_pairs(name, &pairs)
}

#[test]
fn join_of_unequal_histories() {
    // A: 100 points from day 0. B: 60 points from day 40.
    let a = series_from_returns("A", 0, &[0.001; 99]);
    let b = series_from_returns("B", 40, &[-0.002; 59]);
    let table = MarketTable::from_series(vec![a, b]).unwrap();

    assert_eq!(table.row_count(), 100);
    let b_col = table.column("B").unwrap();
    assert_eq!(b_col.first_valid_row(), Some(40));
    assert!(b_col.values[..40].iter().all(Option::is_none));

    let daily = daily_returns(&table);
    // A's own returns cover every row after the first.
    assert_eq!(daily.valid("A").len(), 99);
    assert_eq!(daily.valid("B").len(), 59);
    // Cross-correlation input only keeps rows where both have a return.
    let rows = daily.complete_rows();
    assert_eq!(rows.len(), 59);
    assert_eq!(rows[0].0, day(41));
    assert_eq!(correlation_matrix(&daily).observations, 59);
}

#[test]
fn missing_five_inflated_days() {
    let r = 0.0004;
    let mut returns = vec![r; 300];
    for i in [20, 75, 130, 190, 250] {
        returns[i] = 0.08;
    }
    let s = series_from_returns("S&P 500 (US)", 0, &returns);
    let report = simulate(&s, 10_000.0, &[5]).unwrap();

    let n = returns.len() as i32;
    let expected = 10_000.0 * (1.0 + r).powi(n - 5);
    let miss5 = &report.scenarios[1];
    assert_eq!(miss5.label, "Miss 5 Best");
    assert!((miss5.final_value - expected).abs() < 1e-6 * expected);

    let baseline = 10_000.0 * (1.0 + r).powi(n - 5) * 1.08_f64.powi(5);
    assert!((report.baseline().final_value - baseline).abs() < 1e-6 * baseline);
    assert_eq!(report.return_days, 300);
}

#[test]
fn short_history_is_reported_as_skip() {
    let s = series_from_returns("Tiny", 0, &[0.01; 50]);
    let table = MarketTable::from_series(vec![s]).unwrap();
    let err = timing_cost_for(&table, "Tiny", 1000.0, &[5]).unwrap_err();
    assert_eq!(
        err,
        AnalysisError::Timing(TimingError::InsufficientHistory {
            name: "Tiny".into(),
            observations: 51,
            required: 100,
        })
    );
}

#[test]
fn legacy_snapshot_names_reach_analysis_upgraded() {
    let mut csv = String::from("snapshot_date,FTSE 100,Hang Seng (HK)\n");
    for i in 0..5 {
        csv.push_str(&format!("{},{},{}\n", day(i), 7000.0 + i as f64, 17000.0 - i as f64));
    }
    let loaded = read_snapshot(csv.as_bytes()).unwrap();
    let stats = summary_statistics(&loaded.table);
    assert_eq!(stats[0].name, "FTSE 100 (UK)");
    assert_eq!(stats[1].name, "Hang Seng (HK)");
}

#[test]
fn constant_column_does_not_break_summary() {
    let flat = series_from_returns("Flat", 0, &[0.0; 20]);
    let live = series_from_returns("Live", 0, &[0.01, -0.01, 0.02, 0.0, 0.005]);
    let table = MarketTable::from_series(vec![flat, live]).unwrap();
    let stats = summary_statistics(&table);
    assert!(stats[0].sharpe.is_nan());
    assert!(stats[1].sharpe.is_finite());
}

#[test]
fn analyze_and_export_bundle() {
    let a = series_from_returns("S&P 500 (US)", 0, &[0.0003; 150]);
    let table = MarketTable::from_series(vec![a]).unwrap();
    let loaded = LoadedTable {
        table,
        origin: TableOrigin::Snapshot,
        recovered: Vec::new(),
        failed: Vec::new(),
        renamed: Vec::new(),
    };
    let config = AnalysisConfig::default();
    let result = analyze_table(&loaded, &config, day(0), day(150));
    assert!(matches!(result.timing, TimingOutcome::Completed(_)));

    let dir = tempfile::tempdir().unwrap();
    let written = save_artifacts(&result, &config.render, dir.path()).unwrap();
    assert!(written.last().unwrap().ends_with(MANIFEST_FILE));
    assert!(dir.path().join(TIMING_FILE).exists());

    let manifest = load_manifest(dir.path()).unwrap();
    assert_eq!(manifest.fingerprint, result.fingerprint);
    assert_eq!(manifest.render, config.render);
    assert!(manifest.files.iter().any(|f| f == ROLLING_FILE));
    assert!(dir.path().join(ROLLING_FILE).exists());
    assert_eq!(
        manifest.timing,
        TimingStatus::Completed {
            index: "S&P 500 (US)".into(),
            scenarios: 6,
        }
    );
}

#[test]
fn synthetic_run_writes_snapshot_then_reuses_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AnalysisConfig::default();
    config.run.start_date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    config.run.end_date = Some(NaiveDate::from_ymd_opt(2021, 12, 31).unwrap());
    config.run.snapshot = dir.path().join("market_indices_data.csv");
    let provider = SyntheticProvider::new();
    let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let first = run_analysis(&config, &provider, Some(&provider), today).unwrap();
    assert_eq!(first.origin, TableOrigin::Fetched);
    assert_eq!(first.indices[0], "Shanghai Composite (CN)");

    let second = run_analysis(&config, &provider, Some(&provider), today).unwrap();
    assert_eq!(second.origin, TableOrigin::Snapshot);
    assert_eq!(second.fingerprint, first.fingerprint);
}
