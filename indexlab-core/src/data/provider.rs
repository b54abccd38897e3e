//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over upstream sources (Yahoo Finance, Sina,
//! synthetic) so the reconciler can walk a fallback chain and tests can mock
//! every source without network access.

use crate::domain::IndexSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for a single provider call.
///
/// These are designed to be displayable in CLI output and in the report manifest.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no observations for {symbol} between {start} and {end}")]
    EmptySeries {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("data error: {0}")]
    Other(String),
}

/// A failed adapter attempt, carried as a value instead of being caught and printed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{provider} could not serve '{symbol}': {cause}")]
pub struct SourceUnavailable {
    pub provider: String,
    pub symbol: String,
    pub cause: DataError,
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Sina,
    Synthetic,
}

/// Trait for data providers (Yahoo Finance, Sina, synthetic).
///
/// Implementations return a closing-price series clipped to `[start, end]`
/// inclusive, or a `DataError`. They must not panic on transient failures.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Which source this provider represents.
    fn source(&self) -> DataSource;

    /// Fetch daily closing prices for a symbol over a date range.
    ///
    /// `display_name` becomes the series name; the symbol is the provider's own.
    fn fetch(
        &self,
        symbol: &str,
        display_name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IndexSeries, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

/// Clip a freshly parsed series to the requested range, failing if nothing is left.
pub(crate) fn clip_or_empty(
    series: IndexSeries,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<IndexSeries, DataError> {
    let clipped = series.clip(start, end);
    if clipped.is_empty() {
        return Err(DataError::EmptySeries {
            symbol: symbol.to_string(),
            start,
            end,
        });
    }
    Ok(clipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn source_tags_are_upstream_sources_only() {
        for (source, tag) in [
            (DataSource::YahooFinance, "\"YahooFinance\""),
            (DataSource::Sina, "\"Sina\""),
            (DataSource::Synthetic, "\"Synthetic\""),
        ] {
            assert_eq!(serde_json::to_string(&source).unwrap(), tag);
        }
        // Snapshot-loaded columns carry no provider provenance.
        assert!(serde_json::from_str::<DataSource>("\"Snapshot\"").is_err());
    }

    #[test]
    fn clipping_to_nothing_is_an_empty_series_error() {
        let s = IndexSeries::from_pairs("X", &[(d(2), 1.0), (d(3), 2.0)]);
        let err = clip_or_empty(s.clone(), "^X", d(10), d(20)).unwrap_err();
        assert!(matches!(err, DataError::EmptySeries { .. }));
        assert_eq!(clip_or_empty(s, "^X", d(3), d(20)).unwrap().len(), 1);
    }
}
