use std::path::PathBuf;

use overbounce_runtime::{ConfigError, PredictorError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Exit code for unusable input: bad arguments or a malformed trace.
pub const EXIT_USAGE: i32 = 2;

/// Exit code for an unreadable or invalid policy file.
pub const EXIT_POLICY: i32 = 3;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("policy {path}: {source}")]
    Policy {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("predictor error: {0}")]
    Predictor(#[from] PredictorError),

    #[error("trace line {line}: {message}")]
    Trace { line: usize, message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("replay worker did not drain within {millis}ms")]
    DrainTimeout { millis: u64 },
}

impl HarnessError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Trace { .. } | Self::InvalidArgument { .. } => EXIT_USAGE,
            Self::Policy { .. } => EXIT_POLICY,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn trace(line: usize, message: impl Into<String>) -> Self {
        Self::Trace {
            line,
            message: message.into(),
        }
    }
}
