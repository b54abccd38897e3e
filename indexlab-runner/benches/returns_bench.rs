//! Criterion benchmarks for the returns engine hot paths.
//!
//! Run with: `cargo bench -p indexlab-runner`
//!
//! Measures the per-table passes that scale with history length:
//! - Daily and rolling returns over a multi-index table
//! - Holding-period statistics (six rolling passes)
//! - Summary statistics
//! - Timing-cost simulation on a single long series

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexlab_core::data::synthetic::generate_walk;
use indexlab_core::domain::{IndexSeries, MarketTable};
use indexlab_runner::holding::holding_period_stats;
use indexlab_runner::returns::{daily_returns, rolling_returns, Horizon};
use indexlab_runner::summary::summary_statistics;
use indexlab_runner::timing::{simulate, DEFAULT_BEST_DAY_COUNTS};

const SYMBOLS: [&str; 6] = ["^GSPC", "^IXIC", "^FTSE", "^HSI", "^N225", "^GDAXI"];

/// Synthetic table with `years` of weekday history per index.
fn make_table(years: i64) -> MarketTable {
    let start = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
    let end = start + chrono::Duration::days(years * 365);
    let series = SYMBOLS
        .iter()
        .map(|s| IndexSeries::new(*s, generate_walk(s, start, end)))
        .collect();
    MarketTable::from_series(series).unwrap()
}

fn bench_daily_returns(c: &mut Criterion) {
    let mut group = c.benchmark_group("daily_returns");
    for years in [5, 20, 50] {
        let table = make_table(years);
        group.bench_with_input(BenchmarkId::from_parameter(years), &table, |b, t| {
            b.iter(|| daily_returns(black_box(t)));
        });
    }
    group.finish();
}

fn bench_rolling_returns(c: &mut Criterion) {
    let table = make_table(30);
    let mut group = c.benchmark_group("rolling_returns");
    for years in [1, 10] {
        let h = Horizon::years(years).trading_days();
        group.bench_with_input(BenchmarkId::from_parameter(years), &h, |b, &h| {
            b.iter(|| rolling_returns(black_box(&table), h));
        });
    }
    group.finish();
}

fn bench_holding_periods(c: &mut Criterion) {
    let table = make_table(30);
    c.bench_function("holding_period_stats_30y", |b| {
        b.iter(|| holding_period_stats(black_box(&table)));
    });
}

fn bench_summary(c: &mut Criterion) {
    let table = make_table(30);
    c.bench_function("summary_statistics_30y", |b| {
        b.iter(|| summary_statistics(black_box(&table)));
    });
}

fn bench_timing(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
    let series = IndexSeries::new("^GSPC", generate_walk("^GSPC", start, end));
    c.bench_function("timing_simulate_70y", |b| {
        b.iter(|| simulate(black_box(&series), 10_000.0, &DEFAULT_BEST_DAY_COUNTS));
    });
}

criterion_group!(
    benches,
    bench_daily_returns,
    bench_rolling_returns,
    bench_holding_periods,
    bench_summary,
    bench_timing
);
criterion_main!(benches);
