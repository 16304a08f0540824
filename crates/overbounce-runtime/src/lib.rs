#![forbid(unsafe_code)]

//! Runtime: the background replay predictor and its configuration.
//!
//! # Role in the workspace
//! `overbounce-runtime` turns the pieces of `overbounce-core` into a live
//! predictor: a frame callback feeds a [`FrametimeReporter`], a worker
//! thread replays the recorded history, and the host reads back go/jump
//! probabilities from the [`ReplayPredictor`] at any rate.
//!
//! # Key modules
//! - **[`predictor`]**: [`ReplayPredictor`] lifecycle, parameter updates and
//!   probability queries.
//! - **[`worker`]**: the replay pass and the worker loop.
//! - **[`stop`]**: wakeable stop signal polled by the worker.
//! - **[`policy_config`]**: [`PredictorPolicy`], loadable from TOML/JSON with
//!   the `policy-config` feature.
//!
//! # Logging
//! Events use the `overbounce.replay` target (`overbounce.stats` for the
//! statistics in `overbounce-core`). The crate never installs a subscriber.

pub mod policy_config;
pub mod predictor;
pub mod stop;
pub mod worker;

pub use overbounce_core::{ParameterChange, PhysicsParameters, Scenario};
pub use policy_config::{ConfigError, PredictorPolicy, ReplayPolicyConfig, StatisticsPolicyConfig};
pub use predictor::{FrametimeReporter, PredictorConfig, PredictorError, ReplayPredictor};
pub use worker::{ReplayPass, ScenarioTally, replay_pass};
