#![forbid(unsafe_code)]

//! The replay worker loop.
//!
//! Every `poll_interval` the worker snapshots the unread frametimes and, for
//! offsets `0, 1, 2, ...`, replays the suffix starting at that offset under
//! both scenarios. The first offset where either scenario is still in the
//! air ends the pass: shorter suffixes cannot be decided yet. Resolved
//! offsets are tallied and consumed, so no window is classified twice.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use overbounce_core::{LandingOutcome, ParameterStore, PhysicsParameters, RingConsumer, Scenario};
use web_time::Duration;

use crate::stop::StopSignal;

/// Successes out of resolved replays for one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScenarioTally {
    pub successes: u64,
    pub total: u64,
}

impl ScenarioTally {
    /// `successes / total`, or 0.0 before the first resolved replay.
    #[must_use]
    pub fn probability(self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.successes as f64 / self.total as f64).min(1.0)
    }

    fn record(&mut self, outcome: LandingOutcome) {
        self.total += 1;
        if outcome == LandingOutcome::Overbounce {
            self.successes += 1;
        }
    }
}

/// Result of replaying one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayPass {
    /// Number of leading offsets resolved under both scenarios.
    pub resolved: usize,
    pub go: ScenarioTally,
    pub jump: ScenarioTally,
}

impl ReplayPass {
    #[must_use]
    pub fn tally(&self, scenario: Scenario) -> ScenarioTally {
        match scenario {
            Scenario::Go => self.go,
            Scenario::Jump => self.jump,
        }
    }
}

/// Replay every suffix of `frametimes` until the first unresolved one.
///
/// `cancelled` is polled on every simulation step; a cancelled replay counts
/// as unresolved and ends the pass.
pub fn replay_pass<F>(
    params: &PhysicsParameters,
    frametimes: &[f32],
    band: f32,
    cancelled: F,
) -> ReplayPass
where
    F: Fn() -> bool,
{
    let mut pass = ReplayPass::default();
    let go_velocity = Scenario::Go.initial_velocity(params);
    let jump_velocity = Scenario::Jump.initial_velocity(params);

    for offset in 0..frametimes.len() {
        let window = &frametimes[offset..];
        let go = overbounce_core::simulate_with_band(params, go_velocity, window, band, &cancelled);
        let jump =
            overbounce_core::simulate_with_band(params, jump_velocity, window, band, &cancelled);
        if !go.is_resolved() || !jump.is_resolved() {
            break;
        }
        pass.go.record(go);
        pass.jump.record(jump);
        pass.resolved += 1;
    }
    pass
}

/// Lock-free running tally for one scenario.
#[derive(Debug, Default)]
pub(crate) struct ScenarioCounters {
    successes: AtomicU64,
    total: AtomicU64,
}

impl ScenarioCounters {
    /// Total is bumped before successes and read after it, so a reader
    /// never sees more successes than tries outside of a reset.
    pub(crate) fn add(&self, tally: ScenarioTally) {
        self.total.fetch_add(tally.total, Ordering::Release);
        self.successes.fetch_add(tally.successes, Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.successes.store(0, Ordering::Release);
        self.total.store(0, Ordering::Release);
    }

    pub(crate) fn load(&self) -> ScenarioTally {
        let successes = self.successes.load(Ordering::Acquire);
        let total = self.total.load(Ordering::Acquire);
        ScenarioTally { successes, total }
    }
}

/// State shared between the predictor handle and its worker.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub(crate) params: ParameterStore,
    pub(crate) go: ScenarioCounters,
    pub(crate) jump: ScenarioCounters,
    /// Set by the host when the trajectory changed; applied by the worker,
    /// which is the only owner of the read cursor.
    pub(crate) reset_requested: AtomicBool,
    /// Completed worker iterations, across restarts.
    pub(crate) iterations: AtomicU64,
}

impl SharedState {
    pub(crate) fn counters(&self, scenario: Scenario) -> &ScenarioCounters {
        match scenario {
            Scenario::Go => &self.go,
            Scenario::Jump => &self.jump,
        }
    }
}

/// Worker tunables copied out of the predictor config.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerSettings {
    pub(crate) poll_interval: Duration,
    pub(crate) band: f32,
}

/// Body of the worker thread. Returns the consumer so the predictor can be
/// restarted.
pub(crate) fn run(
    shared: Arc<SharedState>,
    mut consumer: RingConsumer<f32>,
    stop: StopSignal,
    settings: WorkerSettings,
) -> RingConsumer<f32> {
    tracing::debug!(
        target: "overbounce.replay",
        poll_interval_ms = settings.poll_interval.as_millis() as u64,
        capacity = consumer.capacity(),
        "replay worker started"
    );

    while !stop.sleep(settings.poll_interval) {
        iterate(&shared, &mut consumer, &stop, settings);
        shared.iterations.fetch_add(1, Ordering::AcqRel);
    }

    tracing::debug!(
        target: "overbounce.replay",
        iterations = shared.iterations.load(Ordering::Acquire),
        "replay worker stopped"
    );
    consumer
}

fn iterate(
    shared: &SharedState,
    consumer: &mut RingConsumer<f32>,
    stop: &StopSignal,
    settings: WorkerSettings,
) {
    if shared.reset_requested.swap(false, Ordering::AcqRel) {
        consumer.reset_read_cursor();
        tracing::debug!(
            target: "overbounce.replay",
            unread = consumer.unread_len(),
            "read cursor reset after parameter change"
        );
    }

    let snapshot = shared.params.load();
    // Not configured yet; keep the history for when it is.
    if !(snapshot.params.gravity > 0.0) {
        return;
    }
    let frametimes = consumer.snapshot();
    if frametimes.is_empty() {
        return;
    }

    let _span = tracing::debug_span!(
        "overbounce.replay.pass",
        frametimes = frametimes.len(),
        generation = snapshot.generation,
    )
    .entered();

    let pass = replay_pass(&snapshot.params, &frametimes, settings.band, || {
        stop.is_stopped()
    });

    if shared.params.generation() != snapshot.generation {
        tracing::trace!(
            target: "overbounce.replay",
            resolved = pass.resolved,
            "parameters changed mid-pass, results discarded"
        );
        return;
    }
    if pass.resolved == 0 {
        return;
    }

    shared.go.add(pass.go);
    shared.jump.add(pass.jump);
    consumer.advance_read_cursor(pass.resolved);
    tracing::trace!(
        target: "overbounce.replay",
        resolved = pass.resolved,
        go_successes = pass.go.successes,
        jump_successes = pass.jump.successes,
        "replay pass committed"
    );
}
