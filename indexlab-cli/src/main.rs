//! IndexLab CLI: fetch, analyze, timing and snapshot commands.
//!
//! Commands:
//! - `fetch`: reconcile every catalogue index and write the snapshot CSV
//! - `analyze`: cache-or-recompute the table, run every statistic, export artifacts
//! - `timing`: "miss the N best days" analysis on a persisted snapshot
//! - `snapshot migrate`: rewrite legacy snapshot headers in place

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indexlab_core::data::{
    default_catalogue, load_snapshot, migrate_snapshot, CircuitBreaker, DataProvider, SinaProvider,
    SyntheticProvider, YahooProvider,
};
use indexlab_runner::config::DEFAULT_START_DATE;
use indexlab_runner::export::export_timing_csv;
use indexlab_runner::timing::DEFAULT_BEST_DAY_COUNTS;
use indexlab_runner::{
    load_table, run_analysis, save_artifacts, timing_cost_for, AnalysisConfig, AnalysisResult,
    LoadOptions, TimingOutcome, TimingReport,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "indexlab",
    about = "IndexLab CLI: global equity index returns and market-timing cost"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every catalogue index and write the snapshot CSV.
    Fetch {
        /// Start date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date, default_value = DEFAULT_START_DATE)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Snapshot file to write.
        #[arg(long, default_value = "market_indices_data.csv")]
        snapshot: PathBuf,

        /// Use deterministic synthetic data instead of the network.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Resolve fallback chains on a thread pool.
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Load or fetch the table, compute every statistic and export artifacts.
    Analyze {
        /// Path to a TOML analysis config. Built-in defaults otherwise.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ignore an existing snapshot and fetch again.
        #[arg(long, default_value_t = false)]
        refresh: bool,

        /// Prompt for the date range on stdin.
        #[arg(long, default_value_t = false)]
        interactive: bool,

        /// Start date (YYYY-MM-DD). Overrides the config.
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD). Overrides the config.
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Snapshot file. Overrides the config.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Output directory for artifacts. Overrides the config.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Use deterministic synthetic data instead of the network.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Market-timing cost for one index of a persisted snapshot.
    Timing {
        /// Display name of the index, e.g. "S&P 500 (US)".
        #[arg(long)]
        index: String,

        /// Initial investment.
        #[arg(long, default_value_t = 10_000.0)]
        investment: f64,

        /// Snapshot file to read.
        #[arg(long, default_value = "market_indices_data.csv")]
        snapshot: PathBuf,

        /// Also write the scenario table as CSV.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Snapshot maintenance commands.
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// Upgrade legacy column names and restore canonical column order in place.
    Migrate {
        /// Snapshot CSV to rewrite.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("indexlab=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            start,
            end,
            snapshot,
            synthetic,
            parallel,
        } => run_fetch(start, end, snapshot, synthetic, parallel),
        Commands::Analyze {
            config,
            refresh,
            interactive,
            start,
            end,
            snapshot,
            output_dir,
            synthetic,
        } => run_analyze_cmd(
            config,
            refresh,
            interactive,
            start,
            end,
            snapshot,
            output_dir,
            synthetic,
        ),
        Commands::Timing {
            index,
            investment,
            snapshot,
            output,
        } => run_timing(&index, investment, snapshot, output),
        Commands::Snapshot { action } => match action {
            SnapshotAction::Migrate { file } => run_migrate(file),
        },
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{s}': {e}"))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Primary and secondary providers, either live or synthetic.
fn providers(synthetic: bool) -> Result<(Box<dyn DataProvider>, Box<dyn DataProvider>)> {
    if synthetic {
        return Ok((
            Box::new(SyntheticProvider::new()),
            Box::new(SyntheticProvider::new()),
        ));
    }
    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let primary = YahooProvider::new(circuit_breaker).context("building Yahoo client")?;
    let secondary = SinaProvider::new().context("building Sina client")?;
    Ok((Box::new(primary), Box::new(secondary)))
}

fn run_fetch(
    start: NaiveDate,
    end: Option<NaiveDate>,
    snapshot: PathBuf,
    synthetic: bool,
    parallel: bool,
) -> Result<()> {
    let end = end.unwrap_or_else(today);
    if start > end {
        bail!("start date {start} is after end date {end}");
    }
    let opts = LoadOptions {
        start,
        end,
        snapshot,
        refresh: true,
        parallel,
    };
    let (primary, secondary) = providers(synthetic)?;
    let loaded = load_table(
        &opts,
        &default_catalogue(),
        primary.as_ref(),
        Some(secondary.as_ref()),
    )
    .context("fetching index data")?;

    println!();
    println!("=== Fetch Result ===");
    println!("Snapshot:  {}", opts.snapshot.display());
    println!("Rows:      {}", loaded.table.row_count());
    println!("Indices:   {}", loaded.table.column_count());
    for r in &loaded.recovered {
        let note = if r.truncated { " (truncated)" } else { "" };
        println!(
            "  {:<32} {:<10} {} to {}{note}",
            r.name, r.symbol, r.first_date, r.last_date
        );
    }
    for f in &loaded.failed {
        println!("FAILED: {}", f.name);
        for a in &f.attempts {
            println!("  {} {}: {}", a.provider, a.symbol, a.cause);
        }
    }
    if loaded.has_synthetic() {
        println!();
        println!("WARNING: Snapshot contains SYNTHETIC data");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_analyze_cmd(
    config_path: Option<PathBuf>,
    refresh: bool,
    interactive: bool,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    snapshot: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    synthetic: bool,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    // Command-line values win over the file.
    if let Some(start) = start {
        config.run.start_date = start;
    }
    if let Some(end) = end {
        config.run.end_date = Some(end);
    }
    if let Some(snapshot) = snapshot {
        config.run.snapshot = snapshot;
    }
    if let Some(output_dir) = output_dir {
        config.run.output_dir = output_dir;
    }
    config.run.refresh |= refresh;

    let today = today();
    if interactive {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();
        config.run.start_date =
            prompt_date(&mut input, &mut out, "Start date", config.run.start_date)?;
        let end = prompt_date(&mut input, &mut out, "End date", config.end_date_or(today))?;
        config.run.end_date = Some(end);
    }

    let (primary, secondary) = providers(synthetic)?;
    let result = run_analysis(&config, primary.as_ref(), Some(secondary.as_ref()), today)
        .context("running analysis")?;

    print_summary(&result);

    let written = save_artifacts(&result, &config.render, &config.run.output_dir)?;
    info!(files = written.len(), "artifacts written");
    println!("Artifacts saved to: {}", config.run.output_dir.display());
    Ok(())
}

/// Ask for a date until the answer parses. Empty input or end of input keeps `default`.
fn prompt_date<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
    default: NaiveDate,
) -> Result<NaiveDate> {
    loop {
        write!(out, "{label} (YYYY-MM-DD) [{default}]: ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(default);
        }
        let answer = line.trim();
        if answer.is_empty() {
            return Ok(default);
        }
        match parse_date(answer) {
            Ok(date) => return Ok(date),
            Err(e) => writeln!(out, "Invalid date: {e}")?,
        }
    }
}

fn run_timing(
    index: &str,
    investment: f64,
    snapshot: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    check_investment(investment)?;
    let loaded = load_snapshot(&snapshot)
        .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
    let report = timing_cost_for(&loaded.table, index, investment, &DEFAULT_BEST_DAY_COUNTS)?;

    print_timing(&report);

    if let Some(path) = output {
        let csv = export_timing_csv(&report)?;
        std::fs::write(&path, csv).with_context(|| format!("writing {}", path.display()))?;
        println!("Scenarios saved to: {}", path.display());
    }
    Ok(())
}

fn check_investment(investment: f64) -> Result<()> {
    if !investment.is_finite() || investment <= 0.0 {
        bail!("investment must be a positive finite amount, got {investment}");
    }
    Ok(())
}

fn run_migrate(file: PathBuf) -> Result<()> {
    let renamed = migrate_snapshot(&file, &default_catalogue())
        .with_context(|| format!("migrating {}", file.display()))?;
    if renamed.is_empty() {
        println!("No legacy columns in {}", file.display());
    } else {
        for (old, new) in &renamed {
            println!("Renamed: {old} -> {new}");
        }
    }
    Ok(())
}

fn pct(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.2}%")
    } else {
        "n/a".into()
    }
}

fn print_summary(result: &AnalysisResult) {
    println!();
    println!("=== Analysis Result ===");
    println!("Period:   {} to {}", result.start_date, result.end_date);
    println!("Rows:     {} ({:?})", result.row_count, result.origin);
    println!("Indices:  {}", result.indices.len());
    println!();
    println!(
        "{:<32} {:>10} {:>10} {:>10} {:>8} {:>10}",
        "Index", "Total", "Annual", "Vol", "Sharpe", "Max DD"
    );
    println!("{}", "-".repeat(85));
    for s in &result.summary {
        let sharpe = if s.sharpe.is_finite() {
            format!("{:.2}", s.sharpe)
        } else {
            "n/a".into()
        };
        println!(
            "{:<32} {:>10} {:>10} {:>10} {:>8} {:>10}",
            s.name,
            pct(s.total_return_pct),
            pct(s.annualized_return_pct),
            pct(s.annualized_volatility_pct),
            sharpe,
            pct(s.max_drawdown_pct),
        );
    }

    match &result.timing {
        TimingOutcome::Completed(report) => print_timing(report),
        TimingOutcome::Skipped { index, reason } => {
            println!();
            println!("Timing analysis skipped for {index}: {reason}");
        }
    }

    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    for f in &result.failed {
        println!("WARNING: {} unavailable ({})", f.name, f.attempts.join("; "));
    }
    for name in &result.truncated {
        println!("WARNING: {name} covers less than the requested range");
    }
    println!();
}

fn print_timing(report: &TimingReport) {
    println!();
    println!("--- Market Timing: {} ---", report.index);
    println!(
        "Period:  {} to {} ({} trading days)",
        report.first_date, report.last_date, report.return_days
    );
    println!("Initial: {:.2}", report.initial_investment);
    println!(
        "{:<18} {:>16} {:>10} {:>16} {:>10}",
        "Scenario", "Final Value", "Annual", "Lost", "Lost %"
    );
    for s in &report.scenarios {
        println!(
            "{:<18} {:>16.2} {:>10} {:>16.2} {:>10}",
            s.label,
            s.final_value,
            pct(s.annualized_return_pct),
            s.lost_amount,
            pct(s.lost_pct),
        );
    }
}
