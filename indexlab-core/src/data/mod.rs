//! Data acquisition: provider adapters, fallback reconciliation, snapshots.

pub mod catalogue;
pub mod circuit_breaker;
pub mod close_field;
pub mod provider;
pub mod reconcile;
pub mod sina;
pub mod snapshot;
pub mod synthetic;
pub mod yahoo;

pub use catalogue::{default_catalogue, IndexSpec, Region};
pub use circuit_breaker::CircuitBreaker;
pub use provider::{DataError, DataProvider, DataSource, SourceUnavailable};
pub use reconcile::{
    FailedIndex, ReconcileError, ReconcileOptions, ReconcileReport, Reconciler, RecoveredIndex,
    SeriesOrigin,
};
pub use sina::SinaProvider;
pub use snapshot::{
    load_snapshot, migrate_snapshot, read_snapshot, save_snapshot, write_snapshot, LoadedSnapshot,
    SnapshotError, DATE_COLUMN,
};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
