use std::fmt;

use overbounce_core::OverbounceLevel;
use overbounce_runtime::ScenarioTally;
use serde::Serialize;

/// Everything the harness learned from one trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub frames: usize,
    pub height_difference: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub replay: ScenarioPair<ReplaySummary>,
    pub analytic: ScenarioPair<AnalyticSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioPair<T> {
    pub go: T,
    pub jump: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub successes: u64,
    pub total: u64,
    pub probability: f64,
}

impl From<ScenarioTally> for ReplaySummary {
    fn from(tally: ScenarioTally) -> Self {
        Self {
            successes: tally.successes,
            total: tally.total,
            probability: tally.probability(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalyticSummary {
    pub probability: f64,
    pub closest_min_height_difference: f64,
    pub closest_max_height_difference: f64,
    pub closest_probability: f64,
}

impl AnalyticSummary {
    #[must_use]
    pub fn new(probability: f64, closest: OverbounceLevel) -> Self {
        Self {
            probability,
            closest_min_height_difference: closest.min_height_difference,
            closest_max_height_difference: closest.max_height_difference,
            closest_probability: closest.probability,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "frames: {}  height: {}  gravity: {}  jump velocity: {}",
            self.frames, self.height_difference, self.gravity, self.jump_velocity
        )?;
        for (name, replay, analytic) in [
            ("go", self.replay.go, self.analytic.go),
            ("jump", self.replay.jump, self.analytic.jump),
        ] {
            writeln!(
                f,
                "{name:>4}: replay {:.4} ({}/{})  analytic {:.4}  closest band [{:.3}, {:.3}] p={:.4}",
                replay.probability,
                replay.successes,
                replay.total,
                analytic.probability,
                analytic.closest_min_height_difference,
                analytic.closest_max_height_difference,
                analytic.closest_probability,
            )?;
        }
        Ok(())
    }
}
