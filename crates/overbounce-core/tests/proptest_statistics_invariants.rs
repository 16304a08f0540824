//! Property-based invariant tests for cumulative frametime statistics and
//! the analytic estimator.
//!
//! ## Invariants
//!
//! 1. Partial sums stay ascending and `[k]` equals the sum of the latest
//!    `k + 1` frametimes once enough frames were reported.
//! 2. Histogram mass never goes negative.
//! 3. Each bucket is bounded by 1 (decay-then-add of weights <= 1).
//! 4. The estimate is never larger than the largest histogram mass.
//! 5. The closest level is always a 0.25-wide band.

use overbounce_core::{CumulativeFrametimeStats, closest_overbounce_level, compute_probability};
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

fn arb_frametimes_ms(max_n: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..=40, 1..max_n)
}

fn arb_update_factor() -> impl Strategy<Value = f64> {
    (1u32..=1000).prop_map(|x| x as f64 / 1000.0)
}

fn arb_histogram() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((0u32..=1000).prop_map(|x| x as f64 / 1000.0), 1..3000)
}

// ── 1-3. Statistics ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(150))]

    #[test]
    fn partial_sums_track_latest_frames(
        frametimes in arb_frametimes_ms(200),
        horizon in 0usize..20,
    ) {
        let mut stats = CumulativeFrametimeStats::with_horizons(horizon, 500);
        for &ft in &frametimes {
            stats.report_last_frametime(ft);
        }
        let sums = stats.partial_sums();
        prop_assert!(sums.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(stats.num_reported(), frametimes.len() as u64);

        let known = frametimes.len().min(horizon + 1);
        for k in 0..known {
            let expected: u32 = frametimes.iter().rev().take(k + 1).sum();
            prop_assert_eq!(sums[k], expected);
        }
    }

    #[test]
    fn histogram_mass_bounded(
        frametimes in arb_frametimes_ms(300),
        factor in arb_update_factor(),
    ) {
        let mut stats = CumulativeFrametimeStats::with_horizons(10, 200);
        stats.set_update_factor(factor);
        for &ft in &frametimes {
            stats.report_last_frametime(ft);
            for &mass in stats.relative_frequencies() {
                prop_assert!(mass >= 0.0);
                prop_assert!(mass <= 1.0 + 1e-9);
            }
        }
    }
}

// ── 4-5. Estimator ────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn estimate_bounded_by_histogram(
        histogram in arb_histogram(),
        height in 0.0f64..500.0,
        velocity in 0.0f64..400.0,
        gravity in 100.0f64..1600.0,
    ) {
        let max_mass = histogram.iter().copied().fold(0.0, f64::max);
        let p = compute_probability(&histogram, height, velocity, gravity);
        prop_assert!(p >= 0.0);
        prop_assert!(p <= max_mass);
    }

    #[test]
    fn closest_level_is_band_wide(
        histogram in arb_histogram(),
        height in 0.0f64..500.0,
        velocity in 0.0f64..400.0,
        gravity in 100.0f64..1600.0,
    ) {
        let level = closest_overbounce_level(&histogram, height, velocity, gravity);
        let width = level.max_height_difference - level.min_height_difference;
        prop_assert!((width - 0.25).abs() < 1e-9, "width={width}");
        prop_assert!(level.min_height_difference <= height + 1e-9);
        prop_assert!(level.probability >= 0.0);
    }
}
