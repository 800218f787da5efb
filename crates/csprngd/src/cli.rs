//! Flag parsing and the flag/file/default config merge.
//!
//! A `clap::Parser` struct holds the flags; an optional TOML file supplies
//! a `serde`-deserialized overlay. `build_config` merges both onto the
//! built-in defaults before anything else runs.

use std::path::PathBuf;

use clap::Parser;
use csprng_core::RunnerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ConfigError};

#[derive(Parser, Debug)]
#[command(name = "csprngd")]
#[command(about = "Experimental ChaCha20-based CSPRNG daemon")]
pub struct Cli {
    /// Optional TOML config file. Flags below override its values; its
    /// values override built-in defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Mix fresh hardware (or OS-fallback) entropy into state every
    /// iteration. Only turns the flag on; use the config file to turn it
    /// back off.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub prediction_resistant: bool,

    /// Path to the output FIFO.
    #[arg(long)]
    pub pipe_name: Option<PathBuf>,

    /// Path to read 64-byte seeds from.
    #[arg(long)]
    pub seed_source: Option<PathBuf>,

    /// Minimum seconds between reseeds, per worker.
    #[arg(long)]
    pub reseed_interval: Option<f64>,

    /// Number of generator worker threads.
    #[arg(long)]
    pub rng_threads: Option<usize>,

    /// Emit the interleaved (state, keystr) stream instead of state-only
    /// output. Insecure; testing only.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub emit_keystr: bool,

    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "debug".
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// The subset of `RunnerConfig` fields a TOML file may override. All fields
/// are optional so a file may set as few or as many as it likes; anything
/// absent falls through to the built-in default.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileConfig {
    prediction_resistant: Option<bool>,
    pipe_name: Option<PathBuf>,
    seed_source: Option<PathBuf>,
    reseed_interval_secs: Option<f64>,
    rng_threads: Option<usize>,
    emit_keystr: Option<bool>,
}

fn load_file_config(path: &PathBuf) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.clone(), e))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(path.clone(), e))
}

/// Merge built-in defaults, an optional config file, and CLI flags (in that
/// override order) into a validated `RunnerConfig`.
pub fn build_config(cli: &Cli) -> Result<RunnerConfig, AppError> {
    let mut cfg = RunnerConfig::default();

    if let Some(path) = &cli.config {
        let file = load_file_config(path)?;
        if let Some(v) = file.prediction_resistant {
            cfg.prediction_resistant = v;
        }
        if let Some(v) = file.pipe_name {
            cfg.pipe_name = v;
        }
        if let Some(v) = file.seed_source {
            cfg.seed_source = v;
        }
        if let Some(v) = file.reseed_interval_secs {
            cfg.reseed_interval_secs = v;
        }
        if let Some(v) = file.rng_threads {
            cfg.rng_threads = v;
        }
        if let Some(v) = file.emit_keystr {
            cfg.emit_keystr = v;
        }
    }

    if cli.prediction_resistant {
        cfg.prediction_resistant = true;
    }
    if let Some(v) = &cli.pipe_name {
        cfg.pipe_name = v.clone();
    }
    if let Some(v) = &cli.seed_source {
        cfg.seed_source = v.clone();
    }
    if let Some(v) = cli.reseed_interval {
        cfg.reseed_interval_secs = v;
    }
    if let Some(v) = cli.rng_threads {
        cfg.rng_threads = v;
    }
    if cli.emit_keystr {
        cfg.emit_keystr = true;
    }

    cfg.validate().map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli_with_config(path: Option<PathBuf>) -> Cli {
        Cli {
            config: path,
            prediction_resistant: false,
            pipe_name: None,
            seed_source: None,
            reseed_interval: None,
            rng_threads: None,
            emit_keystr: false,
            log_level: "info".into(),
        }
    }

    #[test]
    fn no_file_no_flags_yields_defaults() {
        let cli = cli_with_config(None);
        let cfg = build_config(&cli).unwrap();
        assert_eq!(cfg.rng_threads, RunnerConfig::default().rng_threads);
    }

    #[test]
    fn file_values_override_defaults_and_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rng_threads = 4\nemit_keystr = true").unwrap();

        let mut cli = cli_with_config(Some(file.path().to_path_buf()));
        let cfg = build_config(&cli).unwrap();
        assert_eq!(cfg.rng_threads, 4);
        assert!(cfg.emit_keystr);

        cli.rng_threads = Some(9);
        let cfg = build_config(&cli).unwrap();
        assert_eq!(cfg.rng_threads, 9);
        assert!(cfg.emit_keystr); // untouched by flags, file value survives
    }

    #[test]
    fn invalid_merged_config_is_rejected() {
        let mut cli = cli_with_config(None);
        cli.rng_threads = Some(0);
        assert!(build_config(&cli).is_err());
    }
}
