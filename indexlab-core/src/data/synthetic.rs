//! Synthetic provider for offline development.
//!
//! Produces a deterministic random walk per symbol. Series produced here are
//! tagged `DataSource::Synthetic` and must never be mistaken for market data.

use super::provider::{clip_or_empty, DataError, DataProvider, DataSource};
use crate::domain::{IndexSeries, PricePoint};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random-walk provider seeded from the symbol name.
#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    /// Symbols this provider pretends not to know (for exercising fallbacks).
    unknown: Vec<String>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `fetch` fail with `SymbolNotFound` for these symbols.
    pub fn with_unknown_symbols(symbols: &[&str]) -> Self {
        Self {
            unknown: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Generate weekday closes from a starting level of 100.0.
pub fn generate_walk(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut points = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
            let daily_return: f64 = rng.gen_range(-0.02..0.0205);
            price *= 1.0 + daily_return;
            points.push(PricePoint::new(current, price));
        }
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }

    points
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(
        &self,
        symbol: &str,
        display_name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IndexSeries, DataError> {
        if self.unknown.iter().any(|s| s == symbol) {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let series = IndexSeries::new(display_name, generate_walk(symbol, start, end));
        clip_or_empty(series, symbol, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn walk_is_deterministic_per_symbol() {
        let (s, e) = range();
        assert_eq!(generate_walk("^GSPC", s, e), generate_walk("^GSPC", s, e));
        assert_ne!(
            generate_walk("^GSPC", s, e)[0].close,
            generate_walk("^N225", s, e)[0].close
        );
    }

    #[test]
    fn walk_skips_weekends() {
        let (s, e) = range();
        let walk = generate_walk("^GSPC", s, e);
        assert_eq!(walk.len(), 23);
        assert!(walk
            .iter()
            .all(|p| !matches!(p.date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)));
    }

    #[test]
    fn unknown_symbol_fails() {
        let (s, e) = range();
        let p = SyntheticProvider::with_unknown_symbols(&["^KLSE"]);
        assert!(p.fetch("^KLSE", "KLCI", s, e).is_err());
        assert!(p.fetch("^FBMKLCI", "KLCI", s, e).is_ok());
    }
}
