#![forbid(unsafe_code)]

//! Decayed histogram of multi-frame durations.
//!
//! A physics step lands at the end of some frame, so the moments a falling
//! body can be observed are sums of consecutive frametimes. For every
//! reported frame, [`CumulativeFrametimeStats`] updates the sums of the last
//! `1, 2, ..., frame_horizon + 1` frametimes and adds mass to the histogram
//! bucket of each sum (whole milliseconds). Older mass decays geometrically,
//! so the histogram tracks recent frame pacing.
//!
//! The histogram is a relative frequency, not a distribution: every report
//! adds up to `frame_horizon + 1` times the update factor, and nothing is
//! ever renormalised.
//!
//! # Example
//!
//! ```
//! use overbounce_core::cumulative::CumulativeFrametimeStats;
//!
//! let mut stats = CumulativeFrametimeStats::new();
//! stats.report_last_frametime(8);
//! assert_eq!(stats.partial_sums()[0], 8);
//! assert_eq!(stats.relative_frequencies()[8], 1.0);
//! ```

use crate::logging::{debug_event, trace_event};

/// Number of consecutive frames (beyond the latest) tracked by default.
pub const DEFAULT_FRAME_HORIZON: usize = 500;

/// Largest cumulative duration (ms) tracked by default.
pub const DEFAULT_TIME_HORIZON_MS: usize = 4000;

/// Default exponential update rate. Slow-adapting.
pub const DEFAULT_UPDATE_FACTOR: f64 = 0.001;

/// Per-frame duration (ms) used to seed partial sums added by a horizon change.
pub const SEED_FRAMETIME_MS: u32 = 8;

/// Rolling cumulative frametime statistics. Single-threaded; see the crate
/// docs for sharing it with another thread.
#[derive(Debug, Clone)]
pub struct CumulativeFrametimeStats {
    /// `[k]` holds the sum of the latest `k + 1` frametimes.
    partial_sums: Vec<u32>,
    /// `[ms]` holds the decayed frequency of a cumulative duration of `ms`.
    frequencies: Vec<f64>,
    num_reported: u64,
    update_factor: f64,
}

impl CumulativeFrametimeStats {
    /// Stats with [`DEFAULT_FRAME_HORIZON`] and [`DEFAULT_TIME_HORIZON_MS`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_horizons(DEFAULT_FRAME_HORIZON, DEFAULT_TIME_HORIZON_MS)
    }

    /// Stats with explicit horizons and the default update factor.
    #[must_use]
    pub fn with_horizons(frame_count: usize, msec: usize) -> Self {
        let mut stats = Self {
            partial_sums: Vec::new(),
            frequencies: Vec::new(),
            num_reported: 0,
            update_factor: DEFAULT_UPDATE_FACTOR,
        };
        stats.set_consecutive_frame_horizon(frame_count);
        stats.set_consecutive_time_horizon(msec);
        stats
    }

    /// Track sums of up to `frame_count + 1` consecutive frames.
    ///
    /// Growing extends the partial sums as if every additional older frame
    /// took [`SEED_FRAMETIME_MS`], which keeps the sums ascending. Shrinking
    /// drops the longest sums.
    pub fn set_consecutive_frame_horizon(&mut self, frame_count: usize) {
        let new_len = frame_count.saturating_add(1);
        if new_len <= self.partial_sums.len() {
            self.partial_sums.truncate(new_len);
        } else {
            let mut sum = self.partial_sums.last().copied().unwrap_or(0);
            self.partial_sums.reserve(new_len - self.partial_sums.len());
            while self.partial_sums.len() < new_len {
                sum = sum.saturating_add(SEED_FRAMETIME_MS);
                self.partial_sums.push(sum);
            }
        }
        debug_event!(
            target: "overbounce.stats",
            frame_horizon = frame_count,
            "consecutive frame horizon set"
        );
    }

    /// Track cumulative durations of `0..=msec` milliseconds.
    ///
    /// New buckets start empty; buckets beyond the new horizon are dropped.
    pub fn set_consecutive_time_horizon(&mut self, msec: usize) {
        self.frequencies.resize(msec.saturating_add(1), 0.0);
        debug_event!(
            target: "overbounce.stats",
            time_horizon_ms = msec,
            "consecutive time horizon set"
        );
    }

    /// How quickly the frequencies follow new frame pacing.
    ///
    /// 1.0 keeps only the latest frame, 0.0 never forgets. Clamped to
    /// `[0, 1]`; NaN is treated as 0.
    pub fn set_update_factor(&mut self, update_factor: f64) {
        self.update_factor = if update_factor.is_nan() {
            0.0
        } else {
            update_factor.clamp(0.0, 1.0)
        };
    }

    /// Add the duration of the frame that just finished.
    pub fn report_last_frametime(&mut self, frametime_ms: u32) {
        self.num_reported += 1;

        // Shift every sum one slot further out while adding the new frame.
        // Back to front, so each source is read before it is overwritten.
        for k in (1..self.partial_sums.len()).rev() {
            self.partial_sums[k] = self.partial_sums[k - 1].saturating_add(frametime_ms);
        }
        if let Some(latest) = self.partial_sums.first_mut() {
            *latest = frametime_ms;
        }
        debug_assert!(self.partial_sums.is_sorted());

        let update_factor = self.effective_update_factor();
        let keep = 1.0 - update_factor;
        for frequency in &mut self.frequencies {
            *frequency *= keep;
        }

        // Sums ascend, so the first one past the horizon ends the update.
        for &sum in &self.partial_sums {
            match self.frequencies.get_mut(sum as usize) {
                Some(bucket) => *bucket += update_factor,
                None => break,
            }
        }

        trace_event!(
            target: "overbounce.stats",
            frametime_ms,
            update_factor,
            num_reported = self.num_reported,
            "frametime reported"
        );
    }

    /// Update factor applied by the most recent report.
    ///
    /// `max(1 / num_reported, configured)`: early reports get more weight
    /// so a young histogram is not dominated by its zero start.
    #[must_use]
    pub fn effective_update_factor(&self) -> f64 {
        if self.num_reported == 0 {
            return 1.0;
        }
        (1.0 / self.num_reported as f64).max(self.update_factor)
    }

    /// `[i]` measures how often, recently, some run of consecutive frames
    /// added up to exactly `i` milliseconds.
    #[must_use]
    pub fn relative_frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// `[k]` is the sum of the latest `k + 1` frametimes.
    #[must_use]
    pub fn partial_sums(&self) -> &[u32] {
        &self.partial_sums
    }

    #[must_use]
    pub fn num_reported(&self) -> u64 {
        self.num_reported
    }

    /// Configured update factor.
    #[must_use]
    pub fn update_factor(&self) -> f64 {
        self.update_factor
    }

    /// Number of consecutive frames tracked beyond the latest one.
    #[must_use]
    pub fn frame_horizon(&self) -> usize {
        self.partial_sums.len().saturating_sub(1)
    }

    /// Largest tracked cumulative duration in milliseconds.
    #[must_use]
    pub fn time_horizon(&self) -> usize {
        self.frequencies.len().saturating_sub(1)
    }
}

impl Default for CumulativeFrametimeStats {
    fn default() -> Self {
        Self::new()
    }
}
