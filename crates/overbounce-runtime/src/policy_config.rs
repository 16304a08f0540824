#![forbid(unsafe_code)]

//! Policy-as-data configuration for the predictor and the frametime
//! statistics.
//!
//! Every tunable lives in one [`PredictorPolicy`] that can be loaded from
//! TOML or JSON at startup instead of being compiled in.
//!
//! # Loading
//!
//! ```toml
//! # overbounce.toml
//! [replay]
//! ring_capacity = 2500
//! poll_interval_ms = 2
//!
//! [statistics]
//! time_horizon_ms = 6000
//! ```
//!
//! ```rust,ignore
//! let policy = PredictorPolicy::from_toml_file("overbounce.toml")?;
//! let (predictor, reporter) = ReplayPredictor::new(policy.to_predictor_config());
//! let stats = policy.to_cumulative_stats();
//! ```
//!
//! # Defaults
//!
//! Every field defaults to the constant the corresponding component uses on
//! its own, so `PredictorPolicy::default()` changes nothing.

#[cfg(feature = "policy-config")]
use std::path::Path;

#[cfg(feature = "policy-config")]
use serde::{Deserialize, Serialize};

use overbounce_core::CumulativeFrametimeStats;
use overbounce_core::cumulative::{
    DEFAULT_FRAME_HORIZON, DEFAULT_TIME_HORIZON_MS, DEFAULT_UPDATE_FACTOR,
};
use overbounce_core::ring::{DEFAULT_CAPACITY, DEFAULT_FORGET_RATIO};
use overbounce_core::OVERBOUNCE_BAND;
use web_time::Duration;

use crate::predictor::{DEFAULT_POLL_INTERVAL, PredictorConfig};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct PredictorPolicy {
    /// Replay predictor parameters.
    pub replay: ReplayPolicyConfig,
    /// Cumulative frametime statistics parameters.
    pub statistics: StatisticsPolicyConfig,
}

impl PredictorPolicy {
    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.replay.ring_capacity == 0 {
            errors.push("replay.ring_capacity must be > 0".into());
        }

        if !(0.0..=1.0).contains(&self.replay.forget_ratio) {
            errors.push(format!(
                "replay.forget_ratio must be in [0, 1], got {}",
                self.replay.forget_ratio
            ));
        }

        if self.replay.poll_interval_ms == 0 {
            errors.push("replay.poll_interval_ms must be > 0".into());
        }

        if !(self.replay.overbounce_band > 0.0) {
            errors.push(format!(
                "replay.overbounce_band must be > 0, got {}",
                self.replay.overbounce_band
            ));
        }

        if self.statistics.frame_horizon == 0 {
            errors.push("statistics.frame_horizon must be > 0".into());
        }

        if self.statistics.time_horizon_ms == 0 {
            errors.push("statistics.time_horizon_ms must be > 0".into());
        }

        // Zero would freeze the histogram after the first few reports.
        if self.statistics.update_factor <= 0.0 || self.statistics.update_factor > 1.0 {
            errors.push(format!(
                "statistics.update_factor must be in (0, 1], got {}",
                self.statistics.update_factor
            ));
        }

        errors
    }

    /// Like [`validate`](Self::validate), as a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Build a [`PredictorConfig`] from this policy.
    #[must_use]
    pub fn to_predictor_config(&self) -> PredictorConfig {
        PredictorConfig::default()
            .with_ring_capacity(self.replay.ring_capacity)
            .with_forget_ratio(self.replay.forget_ratio)
            .with_poll_interval(Duration::from_millis(self.replay.poll_interval_ms))
            .with_overbounce_band(self.replay.overbounce_band)
    }

    /// Build an empty [`CumulativeFrametimeStats`] with these horizons and
    /// update factor.
    #[must_use]
    pub fn to_cumulative_stats(&self) -> CumulativeFrametimeStats {
        let mut stats = CumulativeFrametimeStats::with_horizons(
            self.statistics.frame_horizon,
            self.statistics.time_horizon_ms,
        );
        stats.set_update_factor(self.statistics.update_factor);
        stats
    }

    /// Format as a JSONL line for structured logging.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        format!(
            r#"{{"schema":"overbounce-policy-v1","ring_capacity":{},"forget_ratio":{},"poll_interval_ms":{},"overbounce_band":{},"frame_horizon":{},"time_horizon_ms":{},"update_factor":{}}}"#,
            self.replay.ring_capacity,
            self.replay.forget_ratio,
            self.replay.poll_interval_ms,
            self.replay.overbounce_band,
            self.statistics.frame_horizon,
            self.statistics.time_horizon_ms,
            self.statistics.update_factor,
        )
    }
}

/// Replay predictor parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct ReplayPolicyConfig {
    /// Frametimes kept in the history ring. Default: 1250.
    pub ring_capacity: usize,
    /// Share of the ring dropped on a trajectory change. Default: 0.75.
    pub forget_ratio: f64,
    /// Worker sleep between iterations (ms). Default: 5.
    pub poll_interval_ms: u64,
    /// Landing band height. Default: 0.25.
    pub overbounce_band: f32,
}

impl Default for ReplayPolicyConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_CAPACITY,
            forget_ratio: DEFAULT_FORGET_RATIO,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            overbounce_band: OVERBOUNCE_BAND,
        }
    }
}

/// Cumulative frametime statistics parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct StatisticsPolicyConfig {
    /// Consecutive frames summed per report. Default: 500.
    pub frame_horizon: usize,
    /// Longest cumulative duration tracked (ms). Default: 4000.
    pub time_horizon_ms: usize,
    /// Steady-state histogram update factor. Default: 0.001.
    pub update_factor: f64,
}

impl Default for StatisticsPolicyConfig {
    fn default() -> Self {
        Self {
            frame_horizon: DEFAULT_FRAME_HORIZON,
            time_horizon_ms: DEFAULT_TIME_HORIZON_MS,
            update_factor: DEFAULT_UPDATE_FACTOR,
        }
    }
}

/// Errors that can occur when loading a policy configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
