//! Series reconciler: walk each index's fallback chain and merge the winners.
//!
//! For each logical index:
//! 1. Primary source with the canonical symbol
//! 2. Primary source with each fallback symbol, in listed order
//! 3. Secondary source with the mapped symbol, only if 1-2 all failed
//!
//! The first non-empty series wins and the rest of the chain is skipped.
//! Catalogue entries sharing a display name form one chain, so the table never
//! holds two series under the same name. Indices that fail every attempt are
//! left out of the table and reported separately from short-but-present series.

use super::catalogue::IndexSpec;
use super::provider::{DataError, DataProvider, DataSource, SourceUnavailable};
use crate::domain::{IndexSeries, MarketTable, TableError};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Which step of the chain produced a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesOrigin {
    Primary,
    Fallback,
    Secondary,
}

/// Provenance of one index that made it into the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveredIndex {
    pub name: String,
    pub provider: String,
    pub source: DataSource,
    pub symbol: String,
    pub origin: SeriesOrigin,
    pub observations: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Coverage starts later or ends earlier than requested.
    pub truncated: bool,
}

/// An index that no source could serve, with every attempt's cause.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedIndex {
    pub name: String,
    pub attempts: Vec<SourceUnavailable>,
}

/// Errors that abort reconciliation as a whole.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no index could be fetched from any source ({} failed)", failed.len())]
    NoIndicesAvailable { failed: Vec<FailedIndex> },

    #[error("table assembly failed: {0}")]
    Table(#[from] TableError),
}

/// Knobs for a reconcile run.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Resolve independent chains on the rayon pool. Merge order is unchanged.
    pub parallel: bool,
    /// Calendar days of slack before a series counts as truncated.
    pub truncation_grace_days: i64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            truncation_grace_days: 10,
        }
    }
}

/// Result of a successful reconcile run.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub table: MarketTable,
    /// In table column order.
    pub recovered: Vec<RecoveredIndex>,
    pub failed: Vec<FailedIndex>,
}

impl ReconcileReport {
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn truncated(&self) -> impl Iterator<Item = &RecoveredIndex> {
        self.recovered.iter().filter(|r| r.truncated)
    }
}

struct Attempt<'a> {
    provider: &'a dyn DataProvider,
    symbol: &'a str,
    origin: SeriesOrigin,
}

enum ChainOutcome {
    Recovered(IndexSeries, RecoveredIndex),
    Failed(FailedIndex),
}

/// Walks fallback chains against a primary and an optional secondary provider.
pub struct Reconciler<'a> {
    primary: &'a dyn DataProvider,
    secondary: Option<&'a dyn DataProvider>,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(primary: &'a dyn DataProvider) -> Self {
        Self {
            primary,
            secondary: None,
            options: ReconcileOptions::default(),
        }
    }

    pub fn with_secondary(mut self, secondary: &'a dyn DataProvider) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetch every index in `indices` and merge the results into one table.
    pub fn reconcile(
        &self,
        indices: &[IndexSpec],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ReconcileReport, ReconcileError> {
        let chains = group_by_name(indices);
        info!(
            indices = chains.len(),
            %start,
            %end,
            parallel = self.options.parallel,
            "reconciling index series"
        );

        let outcomes: Vec<ChainOutcome> = if self.options.parallel {
            chains
                .par_iter()
                .map(|chain| self.resolve_chain(chain, start, end))
                .collect()
        } else {
            chains
                .iter()
                .map(|chain| self.resolve_chain(chain, start, end))
                .collect()
        };

        let mut series = Vec::new();
        let mut recovered = Vec::new();
        let mut failed = Vec::new();
        for outcome in outcomes {
            match outcome {
                ChainOutcome::Recovered(s, r) => {
                    series.push(s);
                    recovered.push(r);
                }
                ChainOutcome::Failed(f) => failed.push(f),
            }
        }

        if series.is_empty() {
            warn!(failed = failed.len(), "every index failed on every source");
            return Err(ReconcileError::NoIndicesAvailable { failed });
        }

        let table = MarketTable::from_series(series)?;
        info!(
            columns = table.column_count(),
            rows = table.row_count(),
            failed = failed.len(),
            "reconciled market table"
        );
        Ok(ReconcileReport {
            table,
            recovered,
            failed,
        })
    }

    fn attempts<'s>(&'s self, chain: &[&'s IndexSpec]) -> (Vec<Attempt<'s>>, Vec<Attempt<'s>>) {
        let mut primary = Vec::new();
        let mut secondary = Vec::new();
        for spec in chain {
            if let Some(sym) = &spec.primary {
                primary.push(Attempt {
                    provider: self.primary,
                    symbol: sym,
                    origin: SeriesOrigin::Primary,
                });
            }
            for sym in &spec.fallbacks {
                primary.push(Attempt {
                    provider: self.primary,
                    symbol: sym,
                    origin: SeriesOrigin::Fallback,
                });
            }
            if let (Some(provider), Some(sym)) = (self.secondary, &spec.secondary) {
                secondary.push(Attempt {
                    provider,
                    symbol: sym,
                    origin: SeriesOrigin::Secondary,
                });
            }
        }
        (primary, secondary)
    }

    fn resolve_chain(&self, chain: &[&IndexSpec], start: NaiveDate, end: NaiveDate) -> ChainOutcome {
        let name = chain[0].name.as_str();
        let (primary, secondary) = self.attempts(chain);
        let mut causes = Vec::new();

        for attempt in primary.iter().chain(secondary.iter()) {
            match self.try_attempt(attempt, name, start, end) {
                Ok(series) => {
                    let recovered = self.describe(&series, attempt, start, end);
                    match attempt.origin {
                        SeriesOrigin::Primary => info!(
                            index = name,
                            observations = recovered.observations,
                            "fetched from {}",
                            attempt.provider.name()
                        ),
                        _ => info!(
                            index = name,
                            symbol = attempt.symbol,
                            origin = ?attempt.origin,
                            "recovered via {}",
                            attempt.provider.name()
                        ),
                    }
                    return ChainOutcome::Recovered(series, recovered);
                }
                Err(unavailable) => {
                    debug!(index = name, "{unavailable}");
                    causes.push(unavailable);
                }
            }
        }

        warn!(index = name, attempts = causes.len(), "no source could serve index");
        ChainOutcome::Failed(FailedIndex {
            name: name.to_string(),
            attempts: causes,
        })
    }

    fn try_attempt(
        &self,
        attempt: &Attempt<'_>,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IndexSeries, SourceUnavailable> {
        let unavailable = |cause| SourceUnavailable {
            provider: attempt.provider.name().to_string(),
            symbol: attempt.symbol.to_string(),
            cause,
        };

        if !attempt.provider.is_available() {
            return Err(unavailable(DataError::CircuitBreakerTripped));
        }

        let series = attempt
            .provider
            .fetch(attempt.symbol, name, start, end)
            .map_err(unavailable)?
            .renamed(name)
            .clip(start, end);

        if series.is_empty() {
            return Err(unavailable(DataError::EmptySeries {
                symbol: attempt.symbol.to_string(),
                start,
                end,
            }));
        }
        Ok(series)
    }

    fn describe(
        &self,
        series: &IndexSeries,
        attempt: &Attempt<'_>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RecoveredIndex {
        // Callers only pass non-empty series.
        let first_date = series.first().map_or(start, |p| p.date);
        let last_date = series.last().map_or(end, |p| p.date);
        let grace = chrono::Duration::days(self.options.truncation_grace_days);
        let truncated = first_date > start + grace || last_date + grace < end;

        RecoveredIndex {
            name: series.name().to_string(),
            provider: attempt.provider.name().to_string(),
            source: attempt.provider.source(),
            symbol: attempt.symbol.to_string(),
            origin: attempt.origin,
            observations: series.len(),
            first_date,
            last_date,
            truncated,
        }
    }
}

/// Group catalogue entries by display name, in first-appearance order.
fn group_by_name(indices: &[IndexSpec]) -> Vec<Vec<&IndexSpec>> {
    let mut chains: Vec<Vec<&IndexSpec>> = Vec::new();
    for spec in indices {
        match chains.iter_mut().find(|c| c[0].name == spec.name) {
            Some(chain) => chain.push(spec),
            None => chains.push(vec![spec]),
        }
    }
    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalogue::Region;
    use crate::domain::PricePoint;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted provider: symbol → closes on consecutive January days.
    struct Scripted {
        name: &'static str,
        data: HashMap<&'static str, Vec<f64>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(name: &'static str, data: &[(&'static str, Vec<f64>)]) -> Self {
            Self {
                name,
                data: data.iter().cloned().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl DataProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn source(&self) -> DataSource {
            DataSource::Synthetic
        }

        fn fetch(
            &self,
            symbol: &str,
            display_name: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<IndexSeries, DataError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            let closes = self.data.get(symbol).ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
            let points = closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint::new(jan(i as u32 + 2), *c))
                .collect();
            Ok(IndexSeries::new(display_name, points))
        }
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fallback_symbol_is_used_after_primary_fails() {
        let primary = Scripted::new("p", &[("^FBMKLCI", vec![1500.0, 1510.0])]);
        let spec = IndexSpec::new("KLCI (MY)", Region::Malaysia)
            .primary("^KLSE")
            .fallback("^FBMKLCI");

        let report = Reconciler::new(&primary)
            .reconcile(&[spec], jan(1), jan(31))
            .unwrap();

        assert_eq!(primary.calls(), vec!["^KLSE", "^FBMKLCI"]);
        assert_eq!(report.recovered[0].origin, SeriesOrigin::Fallback);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn secondary_is_skipped_when_primary_succeeds() {
        let primary = Scripted::new("p", &[("^GSPC", vec![100.0])]);
        let secondary = Scripted::new("s", &[(".INX", vec![1.0])]);
        let spec = IndexSpec::new("S&P 500 (US)", Region::UnitedStates)
            .primary("^GSPC")
            .secondary(".INX");

        let report = Reconciler::new(&primary)
            .with_secondary(&secondary)
            .reconcile(&[spec], jan(1), jan(31))
            .unwrap();

        assert!(secondary.calls().is_empty());
        assert_eq!(report.table.column("S&P 500 (US)").unwrap().values, vec![Some(100.0)]);
    }

    #[test]
    fn duplicate_names_resolve_to_first_success() {
        let primary = Scripted::new("p", &[("A1", vec![1.0]), ("A2", vec![2.0])]);
        let specs = vec![
            IndexSpec::new("A", Region::Europe).primary("A1"),
            IndexSpec::new("A", Region::Europe).primary("A2"),
        ];
        let report = Reconciler::new(&primary)
            .reconcile(&specs, jan(1), jan(31))
            .unwrap();

        assert_eq!(primary.calls(), vec!["A1"]);
        assert_eq!(report.table.column_count(), 1);
        assert_eq!(report.table.column("A").unwrap().values, vec![Some(1.0)]);
    }

    #[test]
    fn total_failure_is_an_error() {
        let primary = Scripted::new("p", &[]);
        let spec = IndexSpec::new("A", Region::Europe).primary("A1");
        let err = Reconciler::new(&primary)
            .reconcile(&[spec], jan(1), jan(31))
            .unwrap_err();
        match err {
            ReconcileError::NoIndicesAvailable { failed } => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].attempts[0].symbol, "A1");
            }
            other => panic!("expected NoIndicesAvailable, got {other:?}"),
        }
    }

    #[test]
    fn short_series_is_kept_but_flagged() {
        let primary = Scripted::new("p", &[("A1", vec![1.0, 2.0])]);
        let spec = IndexSpec::new("A", Region::Europe).primary("A1");
        let report = Reconciler::new(&primary)
            .reconcile(&[spec], jan(1), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
            .unwrap();
        assert!(report.table.contains("A"));
        assert_eq!(report.truncated().count(), 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn parallel_matches_sequential() {
        let primary = Scripted::new(
            "p",
            &[("A1", vec![1.0, 2.0]), ("B1", vec![3.0]), ("C1", vec![4.0, 5.0, 6.0])],
        );
        let specs = vec![
            IndexSpec::new("A", Region::Europe).primary("A1"),
            IndexSpec::new("B", Region::Japan).primary("B1"),
            IndexSpec::new("C", Region::China).primary("C1"),
        ];
        let seq = Reconciler::new(&primary)
            .reconcile(&specs, jan(1), jan(31))
            .unwrap();
        let par = Reconciler::new(&primary)
            .with_options(ReconcileOptions {
                parallel: true,
                ..ReconcileOptions::default()
            })
            .reconcile(&specs, jan(1), jan(31))
            .unwrap();
        assert_eq!(seq.table, par.table);
        assert_eq!(par.table.names(), vec!["A", "B", "C"]);
    }
}
