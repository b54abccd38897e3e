//! Reporting and export: CSV tables, JSON manifest, Markdown summary.
//!
//! Rendering is someone else's job. This module writes the plain tables a
//! renderer consumes plus a `manifest.json` carrying provenance and the
//! [`RenderConfig`]. The manifest has a `schema_version`; unknown versions are
//! rejected on load. Non-finite numbers are written as empty cells.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::holding::{PositiveProbability, RollingDistribution};
use crate::returns::ReturnTable;
use crate::runner::{AnalysisResult, TimingOutcome, SCHEMA_VERSION};
use crate::timing::TimingReport;

pub const SUMMARY_FILE: &str = "summary_statistics.csv";
pub const HOLDING_FILE: &str = "holding_periods.csv";
pub const ROLLING_FILE: &str = "rolling_returns.csv";
pub const PROBABILITY_FILE: &str = "positive_probability.csv";
pub const CORRELATION_FILE: &str = "correlation.csv";
pub const NORMALIZED_FILE: &str = "normalized_performance.csv";
pub const CUMULATIVE_FILE: &str = "cumulative_returns.csv";
pub const GROWTH_FILE: &str = "series_growth.csv";
pub const TIMING_FILE: &str = "market_timing_cost_results.csv";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const REPORT_FILE: &str = "report.md";

fn num(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{:.*}", decimals, v)
    } else {
        String::new()
    }
}

fn date_cell(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per index, percent columns rounded to two decimals.
pub fn export_summary_csv(result: &AnalysisResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "Index",
        "Total Return (%)",
        "Annualized Return (%)",
        "Annualized Volatility (%)",
        "Sharpe Ratio",
        "Max Drawdown (%)",
        "Best Day (%)",
        "Worst Day (%)",
        "Data Start",
        "Data End",
        "Trading Days",
    ])?;
    for s in &result.summary {
        wtr.write_record([
            s.name.clone(),
            num(s.total_return_pct, 2),
            num(s.annualized_return_pct, 2),
            num(s.annualized_volatility_pct, 2),
            num(s.sharpe, 2),
            num(s.max_drawdown_pct, 2),
            num(s.best_day_pct, 2),
            num(s.worst_day_pct, 2),
            date_cell(s.first_date),
            date_cell(s.last_date),
            s.trading_days.to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn export_holding_csv(result: &AnalysisResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "horizon", "index", "mean", "std", "min", "max", "positive_pct", "windows",
    ])?;
    for h in &result.holding_periods {
        wtr.write_record([
            h.horizon.label(),
            h.index.clone(),
            num(h.mean, 4),
            num(h.std, 4),
            num(h.min, 4),
            num(h.max, 4),
            num(h.positive_pct, 2),
            h.windows.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Long layout: `horizon,index,date,return_pct`, one row per window.
pub fn export_rolling_csv(dists: &[RollingDistribution]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["horizon", "index", "date", "return_pct"])?;
    for d in dists {
        let horizon = d.horizon.label();
        for (date, r) in &d.windows {
            wtr.write_record([horizon.clone(), d.index.clone(), date.to_string(), num(*r, 4)])?;
        }
    }
    finish(wtr)
}

/// Wide layout: one row per horizon in years, one column per index.
pub fn export_probability_csv(curves: &[PositiveProbability]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["years".to_string()];
    header.extend(curves.iter().map(|c| c.index.clone()));
    wtr.write_record(&header)?;

    let horizons = curves.first().map_or(0, |c| c.points.len());
    for row in 0..horizons {
        let mut record = vec![curves[0].points[row].0.to_string()];
        record.extend(curves.iter().map(|c| num(c.points[row].1, 2)));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

pub fn export_correlation_csv(result: &AnalysisResult) -> Result<String> {
    let m = &result.correlation;
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["index".to_string()];
    header.extend(m.names.iter().cloned());
    wtr.write_record(&header)?;
    for (name, row) in m.names.iter().zip(&m.values) {
        let mut record = vec![name.clone()];
        record.extend(row.iter().map(|v| num(*v, 4)));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Date-indexed wide table; absent cells are empty.
pub fn export_table_csv(table: &ReturnTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["date".to_string()];
    header.extend(table.names().into_iter().map(str::to_string));
    wtr.write_record(&header)?;
    for (row, date) in table.dates().iter().enumerate() {
        let mut record = vec![date.to_string()];
        record.extend(
            table
                .columns()
                .iter()
                .map(|c| c.values[row].map(|v| num(v, 6)).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Long layout: `index,date,growth`.
pub fn export_growth_csv(result: &AnalysisResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "date", "growth"])?;
    for g in &result.series_growth {
        for (date, v) in &g.points {
            wtr.write_record([g.index.clone(), date.to_string(), num(*v, 6)])?;
        }
    }
    finish(wtr)
}

/// Scenario table; the baseline row comes first.
pub fn export_timing_csv(report: &TimingReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "scenario",
        "final_value",
        "annualized_return",
        "lost_amount",
        "lost_percentage",
    ])?;
    for s in &report.scenarios {
        wtr.write_record([
            s.label.clone(),
            num(s.final_value, 2),
            num(s.annualized_return_pct, 4),
            num(s.lost_amount, 2),
            num(s.lost_pct, 4),
        ])?;
    }
    finish(wtr)
}

// ─── Manifest ───────────────────────────────────────────────────────

/// Provenance and styling for one artifact bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub generated_at: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub origin: crate::loader::TableOrigin,
    pub fingerprint: String,
    pub row_count: usize,
    pub indices: Vec<String>,
    pub provenance: Vec<indexlab_core::data::RecoveredIndex>,
    pub failed: Vec<crate::runner::FailedEntry>,
    pub truncated: Vec<String>,
    pub renamed: Vec<(String, String)>,
    pub has_synthetic: bool,
    pub timing: TimingStatus,
    pub render: RenderConfig,
    pub files: Vec<String>,
}

/// Timing-cost outcome as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TimingStatus {
    Completed { index: String, scenarios: usize },
    Skipped { index: String, reason: String },
}

pub fn build_manifest(
    result: &AnalysisResult,
    render: &RenderConfig,
    files: Vec<String>,
) -> Manifest {
    let timing = match &result.timing {
        TimingOutcome::Completed(r) => TimingStatus::Completed {
            index: r.index.clone(),
            scenarios: r.scenarios.len(),
        },
        TimingOutcome::Skipped { index, reason } => TimingStatus::Skipped {
            index: index.clone(),
            reason: reason.clone(),
        },
    };
    Manifest {
        schema_version: SCHEMA_VERSION,
        generated_at: chrono::Local::now().to_rfc3339(),
        start_date: result.start_date,
        end_date: result.end_date,
        origin: result.origin,
        fingerprint: result.fingerprint.clone(),
        row_count: result.row_count,
        indices: result.indices.clone(),
        provenance: result.provenance.clone(),
        failed: result.failed.clone(),
        truncated: result.truncated.clone(),
        renamed: result.renamed.clone(),
        has_synthetic: result.has_synthetic,
        timing,
        render: render.clone(),
        files,
    }
}

/// Parse a manifest, rejecting unknown schema versions.
pub fn import_manifest(json: &str) -> Result<Manifest> {
    let manifest: Manifest =
        serde_json::from_str(json).context("failed to deserialize manifest JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── Markdown report ────────────────────────────────────────────────

fn md_num(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{:.*}", decimals, v)
    } else {
        "n/a".to_string()
    }
}

/// Human-readable summary of one run.
pub fn generate_report(result: &AnalysisResult) -> String {
    let mut md = String::with_capacity(4096);

    md.push_str("# Market Index Report\n\n");
    md.push_str("| Field | Value |\n| --- | --- |\n");
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!("| Source | {:?} |\n", result.origin));
    md.push_str(&format!("| Indices | {} |\n", result.indices.len()));
    md.push_str(&format!("| Rows | {} |\n", result.row_count));
    md.push_str(&format!("| Fingerprint | {} |\n", result.fingerprint));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Summary Statistics\n\n");
    md.push_str("| Index | Total % | Ann. % | Vol % | Sharpe | Max DD % | Days |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: | ---: | ---: |\n");
    for s in &result.summary {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            s.name,
            md_num(s.total_return_pct, 2),
            md_num(s.annualized_return_pct, 2),
            md_num(s.annualized_volatility_pct, 2),
            md_num(s.sharpe, 3),
            md_num(s.max_drawdown_pct, 2),
            s.trading_days
        ));
    }
    md.push('\n');

    md.push_str("## Market Timing Cost\n\n");
    match &result.timing {
        TimingOutcome::Completed(r) => {
            md.push_str(&format!(
                "{} from {} to {}, {} return days, starting with ${:.0}.\n\n",
                r.index, r.first_date, r.last_date, r.return_days, r.initial_investment
            ));
            md.push_str("| Scenario | Final Value | Annualized % | Lost | Lost % |\n");
            md.push_str("| --- | ---: | ---: | ---: | ---: |\n");
            for s in &r.scenarios {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    s.label,
                    md_num(s.final_value, 2),
                    md_num(s.annualized_return_pct, 2),
                    md_num(s.lost_amount, 2),
                    md_num(s.lost_pct, 2)
                ));
            }
        }
        TimingOutcome::Skipped { index, reason } => {
            md.push_str(&format!("Skipped for {index}: {reason}\n"));
        }
    }
    md.push('\n');

    if !result.failed.is_empty() || !result.truncated.is_empty() {
        md.push_str("## Data Coverage\n\n");
        for f in &result.failed {
            md.push_str(&format!(
                "- **{}** unavailable ({} attempts)\n",
                f.name,
                f.attempts.len()
            ));
        }
        for t in &result.truncated {
            md.push_str(&format!("- {t}: shorter history than requested\n"));
        }
        md.push('\n');
    }

    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the full artifact set into `output_dir`.
///
/// Returns the paths written, manifest last.
pub fn save_artifacts(
    result: &AnalysisResult,
    render: &RenderConfig,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let mut files: Vec<(&str, String)> = vec![
        (SUMMARY_FILE, export_summary_csv(result)?),
        (HOLDING_FILE, export_holding_csv(result)?),
        (ROLLING_FILE, export_rolling_csv(&result.rolling_distributions)?),
        (PROBABILITY_FILE, export_probability_csv(&result.positive_probability)?),
        (CORRELATION_FILE, export_correlation_csv(result)?),
        (NORMALIZED_FILE, export_table_csv(&result.normalized)?),
        (CUMULATIVE_FILE, export_table_csv(&result.cumulative)?),
        (GROWTH_FILE, export_growth_csv(result)?),
        (REPORT_FILE, generate_report(result)),
    ];
    if let TimingOutcome::Completed(report) = &result.timing {
        files.push((TIMING_FILE, export_timing_csv(report)?));
    }

    let mut written = Vec::with_capacity(files.len() + 1);
    for (name, content) in &files {
        let path = output_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }

    let names = files.iter().map(|(n, _)| n.to_string()).collect();
    let manifest = build_manifest(result, render, names);
    let json =
        serde_json::to_string_pretty(&manifest).context("failed to serialize manifest to JSON")?;
    let manifest_path = output_dir.join(MANIFEST_FILE);
    std::fs::write(&manifest_path, json)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    written.push(manifest_path);

    Ok(written)
}

/// Load the manifest from an artifact directory.
pub fn load_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_manifest(&json)
}
