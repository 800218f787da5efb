use std::path::PathBuf;

/// Errors that cross a component boundary.
///
/// Precondition violations inside the crypto wrapper are deliberately not
/// represented here: those are fatal bugs, not conditions a caller can
/// recover from, and stay as panics (see `crypto::stream`).
#[derive(Debug, thiserror::Error)]
pub enum CsprngError {
    #[error("failed to read {0} bytes of seed material from {1}: {2}")]
    SeedRead(usize, PathBuf, std::io::Error),

    #[error("short seed read from {0}: expected {1} bytes, got {2}")]
    ShortSeed(PathBuf, usize, usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
