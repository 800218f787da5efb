//! Daemon-level errors: everything that can cross the boundary between
//! config loading / startup and `main`, mapped to an exit code there.
//!
//! One small enum per boundary (`ConfigError` for the config file,
//! `AppError` for everything `main` sees), each variant carrying the path
//! and underlying error rather than a bare string.

use std::path::PathBuf;

use csprng_core::CsprngError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

/// Top-level daemon error. Each variant corresponds to one of the spec's
/// exit codes via [`AppError::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runner(#[from] CsprngError),

    #[error("could not create output FIFO at {0}: {1}")]
    FifoCreate(PathBuf, std::io::Error),

    #[error("could not open output sink {0}: {1}")]
    SinkOpen(PathBuf, std::io::Error),

    #[error("a generator worker hit a fatal cipher precondition violation")]
    CipherPrecondition,
}

impl AppError {
    /// Map to one of the exit codes in the external interface contract:
    /// 0 clean shutdown, 1 fatal startup failure (bad config, no initial
    /// seed, sink unopenable), 2 fatal cipher precondition violation.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 1,
            AppError::Runner(_) => 1,
            AppError::FifoCreate(..) => 1,
            AppError::SinkOpen(..) => 1,
            AppError::CipherPrecondition => 2,
        }
    }
}
