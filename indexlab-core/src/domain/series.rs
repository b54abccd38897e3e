//! Single-index closing price series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Closing prices for one index, keyed by its display name.
///
/// Dates are strictly increasing and unique. Spacing is irregular because
/// every market keeps its own holiday calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSeries {
    name: String,
    points: Vec<PricePoint>,
}

impl IndexSeries {
    /// Build a series from raw points.
    ///
    /// Points are sorted by date; non-finite or non-positive closes are dropped
    /// and the first observation of a duplicated date wins.
    pub fn new(name: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite() && p.close > 0.0);
        // Stable sort keeps upstream order among equal dates.
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            name: name.into(),
            points,
        }
    }

    /// Convenience constructor from `(date, close)` pairs.
    pub fn from_pairs(name: impl Into<String>, pairs: &[(NaiveDate, f64)]) -> Self {
        Self::new(
            name,
            pairs.iter().map(|&(d, c)| PricePoint::new(d, c)).collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Keep only points inside `[start, end]` inclusive.
    pub fn clip(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.points.retain(|p| p.date >= start && p.date <= end);
        self
    }

    /// Same points under a different display name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Simple returns between consecutive observations of this series.
    ///
    /// Element `i` is the return from point `i` to point `i + 1`, dated at
    /// point `i + 1`.
    pub fn daily_returns(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .windows(2)
            .map(|w| (w[1].date, w[1].close / w[0].close - 1.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn new_sorts_and_dedups_keeping_first() {
        let s = IndexSeries::new(
            "X",
            vec![
                PricePoint::new(d("2024-01-03"), 102.0),
                PricePoint::new(d("2024-01-02"), 100.0),
                PricePoint::new(d("2024-01-03"), 999.0),
            ],
        );
        assert_eq!(s.len(), 2);
        assert_eq!(s.points()[0].date, d("2024-01-02"));
        assert_eq!(s.points()[1].close, 102.0);
    }

    #[test]
    fn new_drops_invalid_closes() {
        let s = IndexSeries::from_pairs(
            "X",
            &[
                (d("2024-01-02"), f64::NAN),
                (d("2024-01-03"), 0.0),
                (d("2024-01-04"), 101.0),
            ],
        );
        assert_eq!(s.len(), 1);
        assert_eq!(s.first().unwrap().date, d("2024-01-04"));
    }

    #[test]
    fn clip_is_inclusive() {
        let s = IndexSeries::from_pairs(
            "X",
            &[
                (d("2024-01-02"), 1.0),
                (d("2024-01-03"), 2.0),
                (d("2024-01-04"), 3.0),
                (d("2024-01-05"), 4.0),
            ],
        );
        let c = s.clip(d("2024-01-03"), d("2024-01-04"));
        assert_eq!(c.closes(), vec![2.0, 3.0]);
    }

    #[test]
    fn daily_returns_are_pairwise() {
        let s = IndexSeries::from_pairs("X", &[(d("2024-01-02"), 100.0), (d("2024-01-05"), 110.0)]);
        let r = s.daily_returns();
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].0, d("2024-01-05"));
        assert!((r[0].1 - 0.1).abs() < 1e-12);
    }
}
