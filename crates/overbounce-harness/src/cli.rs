use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use overbounce_core::PhysicsParameters;
use overbounce_runtime::PredictorPolicy;

use crate::error::{HarnessError, Result};
use crate::replay::replay_trace;
use crate::trace::parse_trace;

#[derive(Debug, Parser)]
#[command(
    name = "overbounce-harness",
    about = "Replay a recorded frametime trace through the overbounce predictors",
    version
)]
pub struct Cli {
    /// Frametime trace, one duration in seconds per line. Reads stdin when
    /// omitted or `-`.
    pub trace: Option<PathBuf>,

    /// Policy file (`.json`, otherwise TOML).
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Height above the landing surface.
    #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
    pub height: f32,

    /// Downward acceleration. Must be positive.
    #[arg(long, default_value_t = 800.0, allow_negative_numbers = true)]
    pub gravity: f32,

    /// Upward velocity of a jump.
    #[arg(long = "jump", default_value_t = 270.0, allow_negative_numbers = true)]
    pub jump_velocity: f32,

    /// Give up waiting for the replay worker after this many milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub drain_timeout_ms: u64,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    if !(cli.gravity > 0.0) {
        return Err(HarnessError::invalid(format!(
            "--gravity must be > 0, got {}",
            cli.gravity
        )));
    }

    let policy = match &cli.policy {
        Some(path) => load_policy(path)?,
        None => PredictorPolicy::default(),
    };
    tracing::debug!(target: "overbounce.harness", policy = %policy.to_jsonl(), "policy loaded");

    let frametimes = match cli.trace.as_deref() {
        Some(path) if path != Path::new("-") => parse_trace(BufReader::new(File::open(path)?))?,
        _ => parse_trace(io::stdin().lock())?,
    };

    let params = PhysicsParameters::new(cli.height, cli.gravity, cli.jump_velocity);
    let report = replay_trace(
        &frametimes,
        &policy,
        params,
        Duration::from_millis(cli.drain_timeout_ms),
    )?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

/// Load and validate a policy file, choosing the format by extension.
pub fn load_policy(path: &Path) -> Result<PredictorPolicy> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let loaded = if is_json {
        PredictorPolicy::from_json_file(path)
    } else {
        PredictorPolicy::from_toml_file(path)
    };
    loaded
        .and_then(PredictorPolicy::validated)
        .map_err(|source| HarnessError::Policy {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::io::Write;

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "overbounce-harness",
            "--policy",
            "p.toml",
            "--height",
            "32.5",
            "--gravity",
            "750",
            "--jump",
            "-10",
            "--json",
            "trace.txt",
        ])
        .unwrap();
        assert_eq!(cli.trace.as_deref(), Some(Path::new("trace.txt")));
        assert_eq!(cli.policy.as_deref(), Some(Path::new("p.toml")));
        assert_eq!(cli.height, 32.5);
        assert_eq!(cli.gravity, 750.0);
        assert_eq!(cli.jump_velocity, -10.0);
        assert!(cli.json);
    }

    #[test]
    fn defaults_apply() {
        let cli = Cli::try_parse_from(["overbounce-harness"]).unwrap();
        assert!(cli.trace.is_none());
        assert_eq!(cli.gravity, 800.0);
        assert_eq!(cli.jump_velocity, 270.0);
        assert_eq!(cli.drain_timeout_ms, 10_000);
    }

    #[test]
    fn rejects_non_positive_gravity() {
        let cli = Cli::try_parse_from(["overbounce-harness", "--gravity", "0"]).unwrap();
        let err = run(cli).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);
    }

    #[test]
    fn loads_policy_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("policy.toml");
        std::fs::write(&toml_path, "[replay]\nring_capacity = 100\n").unwrap();
        assert_eq!(load_policy(&toml_path).unwrap().replay.ring_capacity, 100);

        let json_path = dir.path().join("policy.JSON");
        let mut file = File::create(&json_path).unwrap();
        write!(file, r#"{{"statistics":{{"frame_horizon":10}}}}"#).unwrap();
        assert_eq!(load_policy(&json_path).unwrap().statistics.frame_horizon, 10);
    }

    #[test]
    fn invalid_policy_is_policy_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.toml");
        std::fs::write(&path, "[replay]\nring_capacity = 0\n").unwrap();
        let err = load_policy(&path).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_POLICY);
        assert!(err.to_string().contains("ring_capacity"));
    }

    #[test]
    fn runs_trace_file() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.txt");
        std::fs::write(&trace, "# ten ms frames\n0.01\n0.01\n0.01\n").unwrap();
        let policy = dir.path().join("policy.toml");
        std::fs::write(&policy, "[replay]\npoll_interval_ms = 1\n").unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("overbounce-harness"),
            OsStr::new("--policy"),
            policy.as_os_str(),
            trace.as_os_str(),
        ])
        .unwrap();
        run(cli).unwrap();
    }
}
