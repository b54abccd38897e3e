//! Domain types: single-index series and the merged market table.

pub mod series;
pub mod table;

pub use series::{IndexSeries, PricePoint};
pub use table::{MarketTable, TableColumn, TableError};
