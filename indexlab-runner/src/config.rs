//! Analysis configuration loaded from TOML.
//!
//! Every section is optional; missing keys take the defaults below. The
//! `[[indices]]` array, when present, replaces the built-in catalogue.

use crate::timing::DEFAULT_BEST_DAY_COUNTS;
use chrono::NaiveDate;
use indexlab_core::data::{default_catalogue, IndexSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Earliest start date used when none is given.
pub const DEFAULT_START_DATE: &str = "1950-09-07";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("initial investment must be positive, got {0}")]
    NonPositiveInvestment(f64),

    #[error("timing.best_day_counts must not be empty")]
    EmptyBestDayCounts,

    #[error("index catalogue entry has an empty name")]
    EmptyIndexName,

    #[error("index '{0}' appears more than once with conflicting regions")]
    ConflictingIndex(String),

    #[error("index '{0}' has no primary or secondary symbol")]
    NoSymbols(String),
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub render: RenderConfig,
    /// Overrides the built-in catalogue when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<IndexSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunSection {
    pub start_date: NaiveDate,
    /// `None` means today.
    pub end_date: Option<NaiveDate>,
    pub snapshot: PathBuf,
    pub output_dir: PathBuf,
    /// Ignore an existing snapshot and fetch again.
    pub refresh: bool,
    /// Resolve fallback chains on the rayon pool.
    pub parallel: bool,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(1950, 9, 7).unwrap_or(NaiveDate::MIN),
            end_date: None,
            snapshot: PathBuf::from("market_indices_data.csv"),
            output_dir: PathBuf::from("reports"),
            refresh: false,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TimingSection {
    pub index: String,
    pub initial_investment: f64,
    pub best_day_counts: Vec<usize>,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            index: "S&P 500 (US)".to_string(),
            initial_investment: 10_000.0,
            best_day_counts: DEFAULT_BEST_DAY_COUNTS.to_vec(),
        }
    }
}

/// Styling handed to whatever renders the exported tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RenderConfig {
    /// Series colours, cycled in column order.
    pub palette: Vec<String>,
    pub font_family: String,
    pub font_fallbacks: Vec<String>,
    /// Plot cumulative returns on a log axis.
    pub log_scale_cumulative: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            palette: [
                "#003366", "#C0B283", "#2E8B57", "#D32F2F", "#5D4037", "#757575", "#0288D1",
                "#7B1FA2", "#388E3C", "#FBC02D", "#E64A19", "#455A64", "#1976D2", "#C2185B",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            font_family: "sans-serif".to_string(),
            font_fallbacks: vec!["Arial".into(), "Helvetica".into(), "DejaVu Sans".into()],
            log_scale_cumulative: true,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            run: RunSection::default(),
            timing: TimingSection::default(),
            render: RenderConfig::default(),
            indices: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// End date, defaulting to `today`.
    pub fn end_date_or(&self, today: NaiveDate) -> NaiveDate {
        self.run.end_date.unwrap_or(today)
    }

    /// The configured catalogue, or the built-in one.
    pub fn catalogue(&self) -> Vec<IndexSpec> {
        if self.indices.is_empty() {
            default_catalogue()
        } else {
            self.indices.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(end) = self.run.end_date {
            if self.run.start_date > end {
                return Err(ConfigError::InvalidRange {
                    start: self.run.start_date,
                    end,
                });
            }
        }
        let investment = self.timing.initial_investment;
        if !(investment.is_finite() && investment > 0.0) {
            return Err(ConfigError::NonPositiveInvestment(investment));
        }
        if self.timing.best_day_counts.is_empty() {
            return Err(ConfigError::EmptyBestDayCounts);
        }
        validate_catalogue(&self.indices)
    }
}

/// Names must be non-empty and carry at least one symbol. A repeated name is
/// an extra fallback link and must keep the same region.
fn validate_catalogue(indices: &[IndexSpec]) -> Result<(), ConfigError> {
    let mut seen: HashSet<(&str, indexlab_core::data::Region)> = HashSet::new();
    for spec in indices {
        if spec.name.trim().is_empty() {
            return Err(ConfigError::EmptyIndexName);
        }
        if spec.primary.is_none() && spec.fallbacks.is_empty() && spec.secondary.is_none() {
            return Err(ConfigError::NoSymbols(spec.name.clone()));
        }
        if seen.iter().any(|(n, r)| *n == spec.name && *r != spec.region) {
            return Err(ConfigError::ConflictingIndex(spec.name.clone()));
        }
        seen.insert((spec.name.as_str(), spec.region));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_takes_defaults() {
        let cfg = AnalysisConfig::from_toml("").unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
        assert_eq!(cfg.run.start_date.to_string(), DEFAULT_START_DATE);
        assert_eq!(cfg.catalogue().len(), default_catalogue().len());
        assert_eq!(cfg.render.palette.len(), 14);
    }

    #[test]
    fn full_document_parses() {
        let toml = r##"
[run]
start_date = "2000-01-03"
end_date = "2020-12-31"
snapshot = "data/snap.csv"
refresh = true

[timing]
index = "Nikkei 225 (JP)"
initial_investment = 5000.0
best_day_counts = [10, 5]

[render]
palette = ["#000000"]
log_scale_cumulative = false

[[indices]]
name = "Nikkei 225 (JP)"
region = "Japan"
primary = "^N225"
"##;
        let cfg = AnalysisConfig::from_toml(toml).unwrap();
        assert!(cfg.run.refresh);
        assert_eq!(cfg.run.snapshot, PathBuf::from("data/snap.csv"));
        assert_eq!(cfg.run.output_dir, PathBuf::from("reports"));
        assert_eq!(cfg.timing.best_day_counts, vec![10, 5]);
        assert_eq!(cfg.render.font_family, "sans-serif");
        assert_eq!(cfg.catalogue().len(), 1);
        assert_eq!(
            cfg.end_date_or(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()).to_string(),
            "2020-12-31"
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AnalysisConfig::from_toml("[run]\nstart = \"2000-01-01\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = AnalysisConfig::from_toml(
            "[run]\nstart_date = \"2020-01-01\"\nend_date = \"2019-01-01\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRange { .. }));
    }

    #[test]
    fn non_positive_investment_is_rejected() {
        let err = AnalysisConfig::from_toml("[timing]\ninitial_investment = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveInvestment(_)));
    }

    #[test]
    fn index_without_symbols_is_rejected() {
        let toml = "[[indices]]\nname = \"X\"\nregion = \"Europe\"\n";
        assert!(matches!(
            AnalysisConfig::from_toml(toml),
            Err(ConfigError::NoSymbols(_))
        ));
    }

    #[test]
    fn repeated_name_with_other_region_is_rejected() {
        let toml = r#"
[[indices]]
name = "X"
region = "Europe"
primary = "A"

[[indices]]
name = "X"
region = "Japan"
primary = "B"
"#;
        assert!(matches!(
            AnalysisConfig::from_toml(toml),
            Err(ConfigError::ConflictingIndex(_))
        ));
    }
}
