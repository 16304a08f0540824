#![forbid(unsafe_code)]

//! Physics parameters shared between the host and the replay worker.
//!
//! The host changes parameters rarely (map or entity change) while the
//! worker reads them on every iteration. [`ParameterStore`] publishes an
//! immutable [`ParameterSnapshot`] through [`arc_swap::ArcSwap`], so a
//! reader always sees `height_difference`, `gravity` and `jump_velocity`
//! from the same update, and reads never take a lock.
//!
//! Every effective change bumps the snapshot's `generation`. The worker
//! compares generations before and after an iteration to discard results
//! computed under parameters that were replaced mid-flight.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// Vertical-motion parameters for one jump.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicsParameters {
    /// Height above the landing surface that has to be closed.
    pub height_difference: f32,
    /// Downward acceleration. Must be positive for the formulas to make sense.
    pub gravity: f32,
    /// Upward velocity added by a jump.
    pub jump_velocity: f32,
}

impl PhysicsParameters {
    #[must_use]
    pub const fn new(height_difference: f32, gravity: f32, jump_velocity: f32) -> Self {
        Self {
            height_difference,
            gravity,
            jump_velocity,
        }
    }
}

/// Which parts of the parameters differ between two updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterChange {
    /// Height difference or gravity changed; every scenario is invalidated.
    pub trajectory: bool,
    /// Jump velocity changed; only the jump scenario is invalidated.
    pub jump_velocity: bool,
}

impl ParameterChange {
    /// Compare two parameter sets field by field.
    #[must_use]
    pub fn between(old: &PhysicsParameters, new: &PhysicsParameters) -> Self {
        Self {
            trajectory: old.height_difference != new.height_difference
                || old.gravity != new.gravity,
            jump_velocity: old.jump_velocity != new.jump_velocity,
        }
    }

    #[must_use]
    pub const fn is_unchanged(self) -> bool {
        !self.trajectory && !self.jump_velocity
    }

    /// Whether results of the no-impulse scenario are stale.
    #[must_use]
    pub const fn resets_go(self) -> bool {
        self.trajectory
    }

    /// Whether results of the impulse scenario are stale.
    #[must_use]
    pub const fn resets_jump(self) -> bool {
        self.trajectory || self.jump_velocity
    }
}

/// Parameters plus the generation they were published under.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParameterSnapshot {
    pub params: PhysicsParameters,
    pub generation: u64,
}

/// Lock-free store of the current [`ParameterSnapshot`].
pub struct ParameterStore {
    inner: ArcSwap<ParameterSnapshot>,
}

impl ParameterStore {
    /// Create a store at generation 0.
    #[must_use]
    pub fn new(params: PhysicsParameters) -> Self {
        Self {
            inner: ArcSwap::from_pointee(ParameterSnapshot {
                params,
                generation: 0,
            }),
        }
    }

    /// Current snapshot.
    #[inline]
    #[must_use]
    pub fn load(&self) -> ParameterSnapshot {
        **self.inner.load()
    }

    /// Current generation only.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.load().generation
    }

    /// Publish `params` and report what changed relative to the replaced
    /// snapshot.
    ///
    /// Publishing identical parameters keeps the current snapshot and its
    /// generation.
    pub fn update(&self, params: PhysicsParameters) -> ParameterChange {
        let previous = self.inner.rcu(|current| {
            if ParameterChange::between(&current.params, &params).is_unchanged() {
                Arc::clone(current)
            } else {
                Arc::new(ParameterSnapshot {
                    params,
                    generation: current.generation + 1,
                })
            }
        });
        ParameterChange::between(&previous.params, &params)
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(PhysicsParameters::default())
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ParameterStore").field(&self.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_at_generation_zero() {
        let store = ParameterStore::new(PhysicsParameters::new(20.0, 800.0, 270.0));
        let snap = store.load();
        assert_eq!(snap.generation, 0);
        assert_eq!(snap.params.gravity, 800.0);
    }

    #[test]
    fn trajectory_change_resets_both() {
        let store = ParameterStore::new(PhysicsParameters::new(20.0, 800.0, 270.0));
        let change = store.update(PhysicsParameters::new(40.0, 800.0, 270.0));
        assert!(change.trajectory);
        assert!(!change.jump_velocity);
        assert!(change.resets_go());
        assert!(change.resets_jump());
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn jump_change_resets_only_jump() {
        let store = ParameterStore::new(PhysicsParameters::new(20.0, 800.0, 270.0));
        let change = store.update(PhysicsParameters::new(20.0, 800.0, 300.0));
        assert!(!change.resets_go());
        assert!(change.resets_jump());
        assert_eq!(store.load().params.jump_velocity, 300.0);
    }

    #[test]
    fn identical_update_keeps_generation() {
        let params = PhysicsParameters::new(20.0, 800.0, 270.0);
        let store = ParameterStore::new(params);
        let change = store.update(params);
        assert!(change.is_unchanged());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn readers_never_observe_mixed_fields() {
        // Every published set satisfies gravity == 2 * height_difference.
        let store = Arc::new(ParameterStore::new(PhysicsParameters::new(1.0, 2.0, 0.0)));
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 1..2000 {
                    let h = i as f32;
                    store.update(PhysicsParameters::new(h, 2.0 * h, h));
                }
            })
        };
        for _ in 0..20_000 {
            let snap = store.load();
            assert_eq!(snap.params.gravity, 2.0 * snap.params.height_difference);
        }
        writer.join().unwrap();
        assert_eq!(store.generation(), 1999);
    }
}
