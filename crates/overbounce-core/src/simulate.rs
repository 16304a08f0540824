#![forbid(unsafe_code)]

//! Frame-stepped vertical free fall.
//!
//! The game advances physics once per rendered frame by that frame's
//! duration, so where a falling body ends up depends on the exact sequence of
//! frametimes, not only on the elapsed time. [`simulate`] replays one such
//! sequence and reports whether the body came to rest inside the overbounce
//! band.
//!
//! Integration is trapezoidal per step:
//!
//! ```text
//! v' = v - g * dt
//! h' = h + (v + v') / 2 * dt
//! ```
//!
//! which is exact for constant gravity, so the only error source is the
//! discretisation into frames.

use crate::params::PhysicsParameters;

/// Height above the landing surface, inclusive, that still counts as an
/// overbounce.
pub const OVERBOUNCE_BAND: f32 = 0.25;

/// Hypothetical control input replayed by the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Keep moving without an extra impulse.
    Go,
    /// Jump: start with the configured upward velocity.
    Jump,
}

impl Scenario {
    /// Both scenarios in reporting order.
    pub const ALL: [Scenario; 2] = [Scenario::Go, Scenario::Jump];

    /// Initial vertical velocity for this scenario.
    #[must_use]
    pub fn initial_velocity(self, params: &PhysicsParameters) -> f32 {
        match self {
            Self::Go => 0.0,
            Self::Jump => params.jump_velocity,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Jump => "jump",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one replayed frametime window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingOutcome {
    /// Came to rest within `[0, band]` above the surface.
    Overbounce,
    /// Fell through the band in a single step.
    NormalLanding,
    /// Ran out of frametimes (or was cancelled) before reaching the band.
    StillInAir,
}

impl LandingOutcome {
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::StillInAir)
    }
}

/// Replay `frametimes` (seconds) with the default [`OVERBOUNCE_BAND`].
///
/// `cancelled` is polled before every step; once it returns `true` the
/// replay stops and reports [`LandingOutcome::StillInAir`].
pub fn simulate<F>(
    params: &PhysicsParameters,
    initial_velocity: f32,
    frametimes: &[f32],
    cancelled: F,
) -> LandingOutcome
where
    F: Fn() -> bool,
{
    simulate_with_band(params, initial_velocity, frametimes, OVERBOUNCE_BAND, cancelled)
}

/// Replay `frametimes` (seconds) against an explicit band height.
pub fn simulate_with_band<F>(
    params: &PhysicsParameters,
    initial_velocity: f32,
    frametimes: &[f32],
    band: f32,
    cancelled: F,
) -> LandingOutcome
where
    F: Fn() -> bool,
{
    let gravity = params.gravity;
    let mut height = params.height_difference;
    let mut velocity = initial_velocity;

    for &dt in frametimes {
        if cancelled() {
            return LandingOutcome::StillInAir;
        }
        let previous_velocity = velocity;
        velocity -= gravity * dt;
        height += (velocity + previous_velocity) / 2.0 * dt;

        if height <= band {
            return if height >= 0.0 {
                LandingOutcome::Overbounce
            } else {
                LandingOutcome::NormalLanding
            };
        }
    }
    LandingOutcome::StillInAir
}
