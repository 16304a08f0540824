#![forbid(unsafe_code)]

//! Live overbounce probabilities from replayed frametime history.
//!
//! [`ReplayPredictor::new`] splits into two handles:
//!
//! - [`FrametimeReporter`] is the ring producer. The host calls
//!   [`report_last_frametime`](FrametimeReporter::report_last_frametime) once
//!   per rendered frame from its frame thread. It never blocks.
//! - [`ReplayPredictor`] owns the ring consumer and the background worker.
//!   Between [`start`](ReplayPredictor::start) and
//!   [`stop`](ReplayPredictor::stop) the consumer lives on the worker thread;
//!   `stop` hands it back so the predictor can be started again.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped --start()--> Running --stop()--> Stopped
//! ```
//!
//! `start` on a running predictor and `stop` on a stopped one are no-ops.
//! Dropping a running predictor stops it.
//!
//! # Parameter changes
//!
//! A height or gravity change resets both scenario tallies and asks the
//! worker to rewind its read cursor to the most recent slice of history. A
//! jump velocity change resets only the jump tally. Passes that started
//! under the previous parameters are discarded by the worker.

use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, SendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use overbounce_core::ring::{self, DEFAULT_CAPACITY, DEFAULT_FORGET_RATIO};
use overbounce_core::{
    OVERBOUNCE_BAND, ParameterChange, PhysicsParameters, RingConsumer, RingProducer, Scenario,
};
use web_time::Duration;

use crate::stop::{StopTrigger, stop_pair};
use crate::worker::{self, ScenarioTally, SharedState, WorkerSettings};

/// Default sleep between worker iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

const WORKER_THREAD_NAME: &str = "overbounce-replay";

/// Construction-time settings for a [`ReplayPredictor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorConfig {
    /// Frametimes kept in the history ring. Default: 1250.
    pub ring_capacity: usize,
    /// Share of the ring dropped on a trajectory change. Default: 0.75.
    pub forget_ratio: f64,
    /// Sleep between worker iterations. Default: 5ms.
    pub poll_interval: Duration,
    /// Height above the surface that still counts as an overbounce.
    /// Default: 0.25.
    pub overbounce_band: f32,
    /// Parameters in effect before the first `set_parameters` call.
    pub initial_parameters: PhysicsParameters,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_CAPACITY,
            forget_ratio: DEFAULT_FORGET_RATIO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            overbounce_band: OVERBOUNCE_BAND,
            initial_parameters: PhysicsParameters::default(),
        }
    }
}

impl PredictorConfig {
    #[must_use]
    pub fn with_ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_forget_ratio(mut self, ratio: f64) -> Self {
        self.forget_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_overbounce_band(mut self, band: f32) -> Self {
        self.overbounce_band = band;
        self
    }

    #[must_use]
    pub fn with_initial_parameters(mut self, params: PhysicsParameters) -> Self {
        self.initial_parameters = params;
        self
    }
}

/// Errors from starting or stopping the replay worker.
#[derive(Debug)]
pub enum PredictorError {
    /// The OS refused to spawn the worker thread.
    Spawn(std::io::Error),
    /// The worker thread panicked. Its ring consumer is gone.
    WorkerPanicked,
    /// The ring consumer was lost to an earlier failure; the predictor
    /// cannot run again.
    ConsumerLost,
}

impl std::fmt::Display for PredictorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to spawn replay worker: {e}"),
            Self::WorkerPanicked => f.write_str("replay worker panicked"),
            Self::ConsumerLost => f.write_str("replay history consumer is no longer available"),
        }
    }
}

impl std::error::Error for PredictorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) => Some(e),
            Self::WorkerPanicked | Self::ConsumerLost => None,
        }
    }
}

/// Producer handle fed by the host's frame callback.
pub struct FrametimeReporter {
    producer: RingProducer<f32>,
}

impl FrametimeReporter {
    /// Record the duration of the frame that just finished, in seconds.
    #[inline]
    pub fn report_last_frametime(&mut self, seconds: f32) {
        debug_assert!(seconds >= 0.0, "negative frametime {seconds}");
        self.producer.add(seconds);
    }

    /// Frametimes reported so far, modulo the ring capacity.
    #[must_use]
    pub fn insertion_cursor(&self) -> usize {
        self.producer.insertion_cursor()
    }
}

impl std::fmt::Debug for FrametimeReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrametimeReporter")
            .field("capacity", &self.producer.capacity())
            .field("insertion_cursor", &self.producer.insertion_cursor())
            .finish()
    }
}

struct RunningWorker {
    trigger: StopTrigger,
    handle: JoinHandle<Option<RingConsumer<f32>>>,
}

/// Background predictor of the go and jump overbounce probabilities.
pub struct ReplayPredictor {
    config: PredictorConfig,
    shared: Arc<SharedState>,
    /// Present while stopped.
    consumer: Option<RingConsumer<f32>>,
    /// Present while running.
    worker: Option<RunningWorker>,
}

impl ReplayPredictor {
    /// Create a stopped predictor and the reporter that feeds it.
    #[must_use]
    pub fn new(config: PredictorConfig) -> (Self, FrametimeReporter) {
        let (producer, consumer) = ring::bounded(config.ring_capacity, config.forget_ratio);
        let shared = Arc::new(SharedState {
            params: overbounce_core::ParameterStore::new(config.initial_parameters),
            ..SharedState::default()
        });
        (
            Self {
                config,
                shared,
                consumer: Some(consumer),
                worker: None,
            },
            FrametimeReporter { producer },
        )
    }

    /// Launch the worker thread. No-op when already running.
    pub fn start(&mut self) -> Result<(), PredictorError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let consumer = self.consumer.take().ok_or(PredictorError::ConsumerLost)?;

        // The consumer is handed over only after the spawn succeeded, so a
        // failed spawn leaves it with the predictor.
        let (handoff, receive) = mpsc::sync_channel::<RingConsumer<f32>>(1);
        let (trigger, signal) = stop_pair();
        let shared = Arc::clone(&self.shared);
        let settings = WorkerSettings {
            poll_interval: self.config.poll_interval,
            band: self.config.overbounce_band,
        };

        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || {
                let consumer = receive.recv().ok()?;
                Some(worker::run(shared, consumer, signal, settings))
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.consumer = Some(consumer);
                tracing::warn!(
                    target: "overbounce.replay",
                    error = %e,
                    "failed to spawn replay worker"
                );
                return Err(PredictorError::Spawn(e));
            }
        };
        if let Err(SendError(consumer)) = handoff.send(consumer) {
            self.consumer = Some(consumer);
            return match handle.join() {
                Ok(_) => Err(PredictorError::ConsumerLost),
                Err(_) => Err(PredictorError::WorkerPanicked),
            };
        }

        self.worker = Some(RunningWorker { trigger, handle });
        tracing::info!(
            target: "overbounce.replay",
            capacity = self.config.ring_capacity,
            "replay predictor started"
        );
        Ok(())
    }

    /// Signal the worker and wait for it to exit. No-op when stopped.
    ///
    /// Latency is bounded by one simulation step, since the worker polls the
    /// stop signal on every step.
    pub fn stop(&mut self) -> Result<(), PredictorError> {
        let Some(running) = self.worker.take() else {
            return Ok(());
        };
        running.trigger.stop();
        match running.handle.join() {
            Ok(Some(consumer)) => {
                self.consumer = Some(consumer);
                tracing::info!(target: "overbounce.replay", "replay predictor stopped");
                Ok(())
            }
            Ok(None) => Err(PredictorError::ConsumerLost),
            Err(_) => {
                tracing::warn!(target: "overbounce.replay", "replay worker panicked");
                Err(PredictorError::WorkerPanicked)
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Publish new physics parameters and reset whatever they invalidate.
    ///
    /// Returns what changed. Identical parameters change nothing.
    pub fn set_parameters(
        &self,
        height_difference: f32,
        gravity: f32,
        jump_velocity: f32,
    ) -> ParameterChange {
        let params = PhysicsParameters::new(height_difference, gravity, jump_velocity);
        let change = ParameterChange::between(&self.shared.params.load().params, &params);
        if change.is_unchanged() {
            return change;
        }

        if change.trajectory {
            self.shared.reset_requested.store(true, Ordering::Release);
        }
        self.shared.params.update(params);
        if change.resets_go() {
            self.shared.go.reset();
        }
        if change.resets_jump() {
            self.shared.jump.reset();
        }

        tracing::debug!(
            target: "overbounce.replay",
            height_difference,
            gravity,
            jump_velocity,
            trajectory_changed = change.trajectory,
            jump_velocity_changed = change.jump_velocity,
            "physics parameters updated"
        );
        change
    }

    /// Parameters currently used by the worker.
    #[must_use]
    pub fn parameters(&self) -> PhysicsParameters {
        self.shared.params.load().params
    }

    /// Fraction of resolved replays that overbounced, or 0.0 before any
    /// replay resolved.
    #[must_use]
    pub fn probability(&self, scenario: Scenario) -> f64 {
        self.tally(scenario).probability()
    }

    /// Raw successes and tries since the last reset of `scenario`.
    #[must_use]
    pub fn tally(&self, scenario: Scenario) -> ScenarioTally {
        self.shared.counters(scenario).load()
    }

    /// Worker iterations completed since construction.
    ///
    /// Two increments after a report guarantee a full pass has seen it.
    #[must_use]
    pub fn completed_iterations(&self) -> u64 {
        self.shared.iterations.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }
}

impl Drop for ReplayPredictor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(
                target: "overbounce.replay",
                error = %e,
                "replay worker did not stop cleanly"
            );
        }
    }
}

impl std::fmt::Debug for ReplayPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayPredictor")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("parameters", &self.parameters())
            .field("go", &self.tally(Scenario::Go))
            .field("jump", &self.tally(Scenario::Jump))
            .finish()
    }
}
