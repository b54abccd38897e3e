//! Property tests for returns-engine invariants.
//!
//! Uses proptest to verify:
//! 1. Cumulative growth at the last point equals last / first price
//! 2. Max drawdown is never positive, and is zero exactly for non-decreasing prices
//! 3. Rolling returns never fabricate values across gaps
//! 4. Timing scenarios never beat the baseline

use chrono::NaiveDate;
use indexlab_core::domain::{IndexSeries, MarketTable};
use indexlab_runner::{
    cumulative_returns, daily_returns, max_drawdown, rolling_returns, series_cumulative_returns,
    simulate,
};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_prices(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1000.0_f64, min..max)
}

fn series(name: &str, prices: &[f64]) -> IndexSeries {
    let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    let pairs: Vec<(NaiveDate, f64)> = prices
        .iter()
        .enumerate()
        .map(|(i, p)| (start + chrono::Duration::days(i as i64), *p))
        .collect();
    IndexSeries::from_pairs(name, &pairs)
}

// ── 1. Cumulative growth ─────────────────────────────────────────────

proptest! {
    #[test]
    fn cumulative_last_equals_price_ratio(prices in arb_prices(2, 200)) {
        let s = series("X", &prices);
        let table = MarketTable::from_series(vec![s.clone()]).unwrap();
        let cum = cumulative_returns(&daily_returns(&table));
        let last = cum.valid("X").last().copied().unwrap();
        let expected = prices[prices.len() - 1] / prices[0];
        prop_assert!((last - expected).abs() <= 1e-9 * expected.max(1.0));

        let growth = series_cumulative_returns(&s);
        let (_, g) = growth.last().copied().unwrap();
        prop_assert!((g - expected).abs() <= 1e-9 * expected.max(1.0));
    }
}

// ── 2. Drawdown bounds ───────────────────────────────────────────────

proptest! {
    #[test]
    fn drawdown_is_never_positive(prices in arb_prices(1, 200)) {
        prop_assert!(max_drawdown(&prices) <= 0.0);
    }

    #[test]
    fn drawdown_is_zero_iff_non_decreasing(prices in arb_prices(1, 100)) {
        let non_decreasing = prices.windows(2).all(|w| w[1] >= w[0]);
        prop_assert_eq!(max_drawdown(&prices) == 0.0, non_decreasing);
    }

    #[test]
    fn sorted_prices_have_no_drawdown(mut prices in arb_prices(1, 100)) {
        prices.sort_by(|a, b| a.total_cmp(b));
        prop_assert_eq!(max_drawdown(&prices), 0.0);
    }
}

// ── 3. No fabricated returns ─────────────────────────────────────────

proptest! {
    #[test]
    fn rolling_returns_respect_gaps(
        prices in arb_prices(10, 80),
        gap in 0usize..10,
        horizon in 1usize..8,
    ) {
        let a = series("A", &prices);
        // Drop one observation from B so the union table has a hole there.
        let b_pairs: Vec<(NaiveDate, f64)> = a
            .points()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != gap)
            .map(|(_, p)| (p.date, p.close))
            .collect();
        let b = IndexSeries::from_pairs("B", &b_pairs);
        let table = MarketTable::from_series(vec![a, b]).unwrap();
        let rolling = rolling_returns(&table, horizon);

        let col = rolling.column("B").unwrap();
        for (row, v) in col.values.iter().enumerate() {
            let touches_gap = row == gap || (row >= horizon && row - horizon == gap);
            if touches_gap || row < horizon {
                prop_assert!(v.is_none());
            } else {
                prop_assert!(v.is_some());
            }
        }
    }
}

// ── 4. Timing scenarios ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn missing_best_days_never_helps(prices in arb_prices(100, 300)) {
        let s = series("X", &prices);
        let report = simulate(&s, 10_000.0, &[5, 10, 20]).unwrap();
        let base = report.baseline().final_value;
        for pair in report.scenarios.windows(2) {
            prop_assert!(pair[1].final_value <= pair[0].final_value * (1.0 + 1e-12));
        }
        for s in &report.scenarios[1..] {
            prop_assert!(s.lost_amount >= -1e-9 * base);
        }
    }
}
