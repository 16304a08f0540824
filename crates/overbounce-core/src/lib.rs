#![forbid(unsafe_code)]

//! Core: frametime history, replay simulation, and cumulative statistics.
//!
//! # Role in the workspace
//! `overbounce-core` holds everything that does not need its own thread.
//! The runtime crate (`overbounce-runtime`) wraps these pieces in a
//! background replay worker; hosts that only want the analytic estimate can
//! use this crate alone.
//!
//! # Primary responsibilities
//! - **[`ring`]**: single-producer/single-consumer ring of recent frametimes.
//! - **[`params`]**: lock-free, consistent snapshots of the physics parameters.
//! - **[`simulate`]**: frame-stepped free fall classified against the
//!   overbounce band.
//! - **[`cumulative`]**: decayed histogram of multi-frame durations.
//! - **[`analytic`]**: closed-form hit probability from that histogram.
//!
//! # Threading
//! [`CumulativeFrametimeStats`] has no internal synchronisation. Mutate it
//! from one thread; to read it elsewhere, clone
//! [`relative_frequencies`](CumulativeFrametimeStats::relative_frequencies)
//! into a snapshot and hand that over.

mod logging;

pub mod analytic;
pub mod cumulative;
pub mod params;
pub mod ring;
pub mod simulate;

pub use analytic::{OverbounceLevel, closest_overbounce_level, compute_probability};
pub use cumulative::CumulativeFrametimeStats;
pub use params::{ParameterChange, ParameterSnapshot, ParameterStore, PhysicsParameters};
pub use ring::{RingConsumer, RingProducer, RingValue};
pub use simulate::{LandingOutcome, OVERBOUNCE_BAND, Scenario, simulate, simulate_with_band};
