#![forbid(unsafe_code)]

//! Closed-form overbounce estimate from the cumulative frametime histogram.
//!
//! Instead of replaying history, solve the fall analytically for the time
//! `t` at which the body has dropped `height_difference`:
//!
//! ```text
//! t = v/g + sqrt((v/g)^2 + 2 * height_difference / g)
//! ```
//!
//! A physics step can only land on a whole-millisecond cumulative frametime,
//! so the last step before the surface happens at `floor(t * 1000)` ms. The
//! drop at that step decides whether it lands inside the band, and the
//! histogram bucket for that duration says how often such a step recently
//! existed.
//!
//! `gravity` must be strictly positive. Zero or negative gravity is not
//! checked and yields NaN/saturated results.

use crate::simulate::OVERBOUNCE_BAND;

const BAND: f64 = OVERBOUNCE_BAND as f64;

/// The landing band a given fall actually reaches and how likely it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverbounceLevel {
    /// Upper edge of the band (`min_height_difference + 0.25`).
    pub max_height_difference: f64,
    /// Drop at the last whole-millisecond step before the surface.
    pub min_height_difference: f64,
    /// Histogram mass at that step.
    pub probability: f64,
}

/// Millisecond bucket of the last step before impact and the drop at that
/// step, or `None` when it lies beyond the histogram.
fn hit_step(
    frequencies: &[f64],
    height_difference: f64,
    velocity: f64,
    gravity: f64,
) -> Option<(usize, f64)> {
    let v_over_g = velocity / gravity;
    let t = v_over_g + (v_over_g * v_over_g + 2.0 * height_difference / gravity).sqrt();
    // Saturating cast: negative and NaN flight times map to bucket 0.
    let msec_hit = (t * 1000.0) as usize;
    if msec_hit >= frequencies.len() {
        return None;
    }

    let t_hit = msec_hit as f64 / 1000.0;
    let hit_height_difference = -(velocity * t_hit - gravity / 2.0 * t_hit * t_hit);
    Some((msec_hit, hit_height_difference))
}

/// Probability-like mass that a fall of `height_difference` with initial
/// upward `velocity` lands inside the overbounce band.
///
/// Returns 0 when the impact time is beyond the histogram horizon or when
/// the last step before impact is still more than the band above the
/// surface.
#[must_use]
pub fn compute_probability(
    frequencies: &[f64],
    height_difference: f64,
    velocity: f64,
    gravity: f64,
) -> f64 {
    let Some((msec_hit, hit_height_difference)) =
        hit_step(frequencies, height_difference, velocity, gravity)
    else {
        return 0.0;
    };

    if hit_height_difference >= height_difference {
        // Exactly on the edge: rounding decides whether the step lands on or
        // past the surface. Halving is a heuristic, not a derived reduction.
        return frequencies[msec_hit] / 2.0;
    }

    if hit_height_difference > height_difference - BAND {
        frequencies[msec_hit]
    } else {
        0.0
    }
}

/// The band actually reached by this fall, for finding a nearby height that
/// can be hit.
///
/// Beyond the histogram horizon this is the band starting at
/// `height_difference` with zero probability.
#[must_use]
pub fn closest_overbounce_level(
    frequencies: &[f64],
    height_difference: f64,
    velocity: f64,
    gravity: f64,
) -> OverbounceLevel {
    match hit_step(frequencies, height_difference, velocity, gravity) {
        Some((msec_hit, hit_height_difference)) => OverbounceLevel {
            max_height_difference: hit_height_difference + BAND,
            min_height_difference: hit_height_difference,
            probability: frequencies[msec_hit],
        },
        None => OverbounceLevel {
            max_height_difference: height_difference + BAND,
            min_height_difference: height_difference,
            probability: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(len: usize, mass: &[(usize, f64)]) -> Vec<f64> {
        let mut h = vec![0.0; len];
        for &(ms, m) in mass {
            h[ms] = m;
        }
        h
    }

    #[test]
    fn empty_histogram_gives_zero() {
        let h = vec![0.0; 4001];
        assert_eq!(compute_probability(&h, 100.0, 0.0, 800.0), 0.0);
        assert_eq!(compute_probability(&h, 20.0, 0.0, 800.0), 0.0);
    }

    #[test]
    fn in_band_step_returns_full_mass() {
        // t = 0.2236s, the 223ms step has dropped 19.8916.
        let h = histogram(4001, &[(223, 0.4)]);
        assert_eq!(compute_probability(&h, 20.0, 0.0, 800.0), 0.4);
    }

    #[test]
    fn jump_velocity_shifts_hit_step() {
        // t = 0.7424s, the 742ms step has dropped 19.8856.
        let h = histogram(4001, &[(742, 0.3), (223, 0.9)]);
        assert_eq!(compute_probability(&h, 20.0, 270.0, 800.0), 0.3);
    }

    #[test]
    fn exact_edge_is_halved() {
        // t = 0.5s exactly, the 500ms step drops exactly 100.
        let h = histogram(4001, &[(500, 0.8)]);
        assert_eq!(compute_probability(&h, 100.0, 0.0, 800.0), 0.4);
    }

    #[test]
    fn step_above_band_gives_zero() {
        // The 2236ms step has dropped 1999.878, 1.12 short of 2001.
        let h = histogram(4001, &[(2236, 1.0)]);
        assert_eq!(compute_probability(&h, 2001.0, 0.0, 800.0), 0.0);
        assert_eq!(compute_probability(&h, 2000.0, 0.0, 800.0), 1.0);
    }

    #[test]
    fn beyond_horizon_gives_zero() {
        let h = vec![1.0; 100];
        assert_eq!(compute_probability(&h, 20.0, 0.0, 800.0), 0.0);
        assert_eq!(compute_probability(&[], 20.0, 0.0, 800.0), 0.0);
    }

    #[test]
    fn closest_level_reports_reached_band() {
        let h = histogram(4001, &[(2236, 0.7)]);
        let level = closest_overbounce_level(&h, 2001.0, 0.0, 800.0);
        assert!((level.min_height_difference - 1999.8784).abs() < 1e-9);
        assert!((level.max_height_difference - level.min_height_difference - 0.25).abs() < 1e-9);
        assert_eq!(level.probability, 0.7);
    }

    #[test]
    fn closest_level_beyond_horizon() {
        let level = closest_overbounce_level(&[0.5; 10], 20.0, 0.0, 800.0);
        assert_eq!(
            level,
            OverbounceLevel {
                max_height_difference: 20.25,
                min_height_difference: 20.0,
                probability: 0.0,
            }
        );
    }

    #[test]
    fn zero_height_hits_bucket_zero() {
        let h = histogram(10, &[(0, 0.6)]);
        // t = 0: the zero-length step is exactly on the edge.
        assert_eq!(compute_probability(&h, 0.0, 0.0, 800.0), 0.3);
    }
}
