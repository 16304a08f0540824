#![forbid(unsafe_code)]

//! Stop signal for the replay worker.
//!
//! The worker sleeps between iterations and replays frametimes in a tight
//! loop. [`StopSignal::sleep`] replaces a plain `thread::sleep` so a stop
//! request wakes it immediately, and [`StopSignal::is_stopped`] is a single
//! atomic load cheap enough to poll on every simulation step.
//!
//! [`StopTrigger`] stays with the predictor; [`StopSignal`] moves into the
//! worker thread. Dropping the trigger does not stop the worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use web_time::{Duration, Instant};

struct StopState {
    stopped: AtomicBool,
    wake: Condvar,
    lock: Mutex<()>,
}

/// Worker-side view of a stop request.
#[derive(Clone)]
pub struct StopSignal {
    state: Arc<StopState>,
}

/// Predictor-side handle that requests a stop.
pub struct StopTrigger {
    state: Arc<StopState>,
}

/// Create a connected trigger/signal pair in the running state.
#[must_use]
pub fn stop_pair() -> (StopTrigger, StopSignal) {
    let state = Arc::new(StopState {
        stopped: AtomicBool::new(false),
        wake: Condvar::new(),
        lock: Mutex::new(()),
    });
    (
        StopTrigger {
            state: Arc::clone(&state),
        },
        StopSignal { state },
    )
}

impl StopTrigger {
    /// Request a stop and wake a sleeping worker. Idempotent.
    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::Release);
        let _guard = self.state.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.state.wake.notify_all();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::Acquire)
    }
}

impl StopSignal {
    /// Whether a stop was requested.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns `true` if stopped. Spurious condvar wakeups resume the
    /// remaining sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.state.lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if self.is_stopped() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .state
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
    }
}
