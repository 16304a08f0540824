//! Feeding a recorded trace through both predictors.
//!
//! Real time is not simulated: frametimes are reported as fast as possible.
//! To keep the producer from lapping the worker, the trace goes in chunks of
//! half the ring capacity and the harness waits for a full replay pass after
//! each chunk.

use std::thread;
use std::time::{Duration, Instant};

use overbounce_core::{PhysicsParameters, Scenario, closest_overbounce_level, compute_probability};
use overbounce_runtime::{PredictorPolicy, ReplayPredictor};

use crate::error::{HarnessError, Result};
use crate::report::{AnalyticSummary, ReplaySummary, Report, ScenarioPair};
use crate::trace::to_millis;

/// Replay `frametimes` (seconds) and collect the resulting probabilities.
pub fn replay_trace(
    frametimes: &[f32],
    policy: &PredictorPolicy,
    params: PhysicsParameters,
    drain_timeout: Duration,
) -> Result<Report> {
    let config = policy.to_predictor_config().with_initial_parameters(params);
    let (mut predictor, mut reporter) = ReplayPredictor::new(config);
    let mut stats = policy.to_cumulative_stats();

    predictor.start()?;
    let chunk = (config.ring_capacity / 2).max(1);
    for piece in frametimes.chunks(chunk) {
        for &seconds in piece {
            reporter.report_last_frametime(seconds);
            stats.report_last_frametime(to_millis(seconds));
        }
        wait_for_full_pass(&predictor, drain_timeout)?;
    }
    predictor.stop()?;

    let frequencies = stats.relative_frequencies();
    let analytic = |scenario: Scenario| {
        let height = f64::from(params.height_difference);
        let velocity = f64::from(scenario.initial_velocity(&params));
        let gravity = f64::from(params.gravity);
        AnalyticSummary::new(
            compute_probability(frequencies, height, velocity, gravity),
            closest_overbounce_level(frequencies, height, velocity, gravity),
        )
    };

    let report = Report {
        frames: frametimes.len(),
        height_difference: params.height_difference,
        gravity: params.gravity,
        jump_velocity: params.jump_velocity,
        replay: ScenarioPair {
            go: ReplaySummary::from(predictor.tally(Scenario::Go)),
            jump: ReplaySummary::from(predictor.tally(Scenario::Jump)),
        },
        analytic: ScenarioPair {
            go: analytic(Scenario::Go),
            jump: analytic(Scenario::Jump),
        },
    };
    tracing::info!(
        target: "overbounce.harness",
        frames = report.frames,
        go_total = report.replay.go.total,
        jump_total = report.replay.jump.total,
        "trace replayed"
    );
    Ok(report)
}

/// Block until a worker iteration that started after this call finished.
fn wait_for_full_pass(predictor: &ReplayPredictor, timeout: Duration) -> Result<()> {
    let target = predictor.completed_iterations() + 2;
    let start = Instant::now();
    while predictor.completed_iterations() < target {
        if start.elapsed() > timeout {
            return Err(HarnessError::DrainTimeout {
                millis: timeout.as_millis() as u64,
            });
        }
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}
