#![forbid(unsafe_code)]

//! Offline harness: replays a recorded frametime trace through the replay
//! predictor and the cumulative statistics, then reports both estimates.

pub mod cli;
pub mod error;
pub mod replay;
pub mod report;
pub mod trace;

pub use cli::{Cli, run, run_from_env};
pub use error::{HarnessError, Result};
pub use report::Report;
