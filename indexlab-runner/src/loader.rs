//! Table loading for the runner: cache-or-recompute, decided once per run.
//!
//! 1. If a snapshot exists and `refresh` is off → load it (legacy names upgraded)
//! 2. If the snapshot is missing, unreadable or empty → reconcile from providers
//! 3. A freshly reconciled table is written back as the new snapshot
//!
//! The snapshot is used as-is; the requested date range only applies to fetches.

use chrono::NaiveDate;
use indexlab_core::data::{
    load_snapshot, save_snapshot, DataProvider, FailedIndex, IndexSpec, ReconcileError,
    ReconcileOptions, Reconciler, RecoveredIndex, SnapshotError,
};
use indexlab_core::domain::MarketTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reconcile failed: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("could not write snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Options controlling where the table comes from.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub snapshot: PathBuf,
    /// Skip the snapshot and fetch again.
    pub refresh: bool,
    pub parallel: bool,
}

/// Where the run's table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableOrigin {
    Snapshot,
    Fetched,
}

/// The run's table plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: MarketTable,
    pub origin: TableOrigin,
    /// Empty when loaded from a snapshot.
    pub recovered: Vec<RecoveredIndex>,
    pub failed: Vec<FailedIndex>,
    /// Legacy column renames applied on snapshot load.
    pub renamed: Vec<(String, String)>,
}

impl LoadedTable {
    /// True if any column came from the synthetic provider.
    pub fn has_synthetic(&self) -> bool {
        self.recovered
            .iter()
            .any(|r| r.source == indexlab_core::data::DataSource::Synthetic)
    }
}

/// Load the run's table from the snapshot or from providers.
pub fn load_table(
    opts: &LoadOptions,
    catalogue: &[IndexSpec],
    primary: &dyn DataProvider,
    secondary: Option<&dyn DataProvider>,
) -> Result<LoadedTable, LoadError> {
    // Step 1: snapshot
    if !opts.refresh && opts.snapshot.exists() {
        match load_snapshot(&opts.snapshot) {
            Ok(loaded) if loaded.table.row_count() > 0 && !loaded.table.is_empty() => {
                return Ok(LoadedTable {
                    table: loaded.table,
                    origin: TableOrigin::Snapshot,
                    recovered: Vec::new(),
                    failed: Vec::new(),
                    renamed: loaded.renamed,
                });
            }
            Ok(_) => warn!(path = %opts.snapshot.display(), "snapshot is empty; fetching"),
            Err(e) => warn!(
                path = %opts.snapshot.display(),
                error = %e,
                "failed to load snapshot; fetching"
            ),
        }
    }

    // Step 2: reconcile
    let mut reconciler = Reconciler::new(primary).with_options(ReconcileOptions {
        parallel: opts.parallel,
        ..ReconcileOptions::default()
    });
    if let Some(secondary) = secondary {
        reconciler = reconciler.with_secondary(secondary);
    }
    info!(start = %opts.start, end = %opts.end, "fetching index data");
    let report = reconciler.reconcile(catalogue, opts.start, opts.end)?;

    // Step 3: persist
    let table = save_snapshot(&report.table, &opts.snapshot, catalogue)?;
    let recovered = table
        .names()
        .into_iter()
        .filter_map(|n| report.recovered.iter().find(|r| r.name == n).cloned())
        .collect();

    Ok(LoadedTable {
        table,
        origin: TableOrigin::Fetched,
        recovered,
        failed: report.failed,
        renamed: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexlab_core::data::{default_catalogue, SyntheticProvider};

    fn opts(dir: &std::path::Path) -> LoadOptions {
        LoadOptions {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
            snapshot: dir.join("market_indices_data.csv"),
            refresh: false,
            parallel: false,
        }
    }

    #[test]
    fn fetch_then_reuse_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SyntheticProvider::new();
        let catalogue = default_catalogue();
        let o = opts(dir.path());

        let secondary: &dyn DataProvider = &provider;
        let first = load_table(&o, &catalogue, &provider, Some(secondary)).unwrap();
        assert_eq!(first.origin, TableOrigin::Fetched);
        assert!(first.has_synthetic());
        assert!(o.snapshot.exists());
        assert_eq!(first.recovered.len(), first.table.column_count());
        assert_eq!(first.recovered[0].name, first.table.names()[0]);

        let second = load_table(&o, &catalogue, &provider, Some(secondary)).unwrap();
        assert_eq!(second.origin, TableOrigin::Snapshot);
        assert_eq!(second.table.fingerprint(), first.table.fingerprint());
    }

    #[test]
    fn refresh_ignores_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SyntheticProvider::new();
        let mut o = opts(dir.path());
        std::fs::write(&o.snapshot, "snapshot_date,A\n2024-01-02,1.0\n").unwrap();

        o.refresh = true;
        let loaded = load_table(&o, &default_catalogue(), &provider, None).unwrap();
        assert_eq!(loaded.origin, TableOrigin::Fetched);
        assert!(!loaded.table.contains("A"));
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SyntheticProvider::new();
        let o = opts(dir.path());
        std::fs::write(&o.snapshot, "snapshot_date,A\nnot-a-date,1.0\n").unwrap();

        let loaded = load_table(&o, &default_catalogue(), &provider, None).unwrap();
        assert_eq!(loaded.origin, TableOrigin::Fetched);
    }
}
