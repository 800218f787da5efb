//! Runtime configuration shared (by value or by `Arc`) with every component.
//!
//! Built once in `main`, validated once, never mutated afterwards. No
//! component re-reads environment variables or a global after startup; this
//! is the "process-wide mutable state → explicit configuration value"
//! redesign from the spec's Design Notes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CsprngError;

/// Fully resolved, validated configuration for one `csprngd` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Mix fresh hardware (or OS-fallback) entropy into `state` every
    /// iteration. Defeats bit-for-bit reproducibility when enabled.
    #[serde(default)]
    pub prediction_resistant: bool,

    /// Where the output FIFO is created and written.
    #[serde(default = "default_pipe_name")]
    pub pipe_name: PathBuf,

    /// Where 64-byte seeds are read from.
    #[serde(default = "default_seed_source")]
    pub seed_source: PathBuf,

    /// Minimum gap between reseeds, per worker.
    #[serde(default = "default_reseed_interval_secs")]
    pub reseed_interval_secs: f64,

    /// Number of generator worker threads.
    #[serde(default = "default_rng_threads")]
    pub rng_threads: usize,

    /// Emit the insecure interleaved `(state, keystr)` backdoor stream
    /// instead of `state`-only output. Default `false` (secure).
    #[serde(default)]
    pub emit_keystr: bool,
}

fn default_pipe_name() -> PathBuf {
    PathBuf::from("/tmp/csprng")
}

fn default_seed_source() -> PathBuf {
    PathBuf::from("/tmp/randentropy")
}

fn default_reseed_interval_secs() -> f64 {
    0.2
}

fn default_rng_threads() -> usize {
    1
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            prediction_resistant: false,
            pipe_name: default_pipe_name(),
            seed_source: default_seed_source(),
            reseed_interval_secs: default_reseed_interval_secs(),
            rng_threads: default_rng_threads(),
            emit_keystr: false,
        }
    }
}

impl RunnerConfig {
    pub fn reseed_interval(&self) -> Duration {
        Duration::from_secs_f64(self.reseed_interval_secs)
    }

    /// Seed queue capacity: `2 * rng_threads`.
    pub fn seed_queue_capacity(&self) -> usize {
        2 * self.rng_threads
    }

    /// Data queue capacity: `100 * rng_threads`.
    pub fn data_queue_capacity(&self) -> usize {
        100 * self.rng_threads
    }

    pub fn validate(self) -> Result<Self, CsprngError> {
        if self.rng_threads == 0 {
            return Err(CsprngError::InvalidConfig(
                "rng_threads must be at least 1".into(),
            ));
        }
        if !(self.reseed_interval_secs > 0.0) {
            return Err(CsprngError::InvalidConfig(
                "reseed_interval must be a positive number of seconds".into(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_external_interface_contract() {
        let cfg = RunnerConfig::default();
        assert!(!cfg.prediction_resistant);
        assert_eq!(cfg.pipe_name, PathBuf::from("/tmp/csprng"));
        assert_eq!(cfg.seed_source, PathBuf::from("/tmp/randentropy"));
        assert_eq!(cfg.reseed_interval_secs, 0.2);
        assert_eq!(cfg.rng_threads, 1);
        assert!(!cfg.emit_keystr);
    }

    #[test]
    fn queue_capacities_scale_with_thread_count() {
        let mut cfg = RunnerConfig::default();
        cfg.rng_threads = 3;
        assert_eq!(cfg.seed_queue_capacity(), 6);
        assert_eq!(cfg.data_queue_capacity(), 300);
    }

    #[test]
    fn rejects_zero_threads() {
        let mut cfg = RunnerConfig::default();
        cfg.rng_threads = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_reseed_interval() {
        let mut cfg = RunnerConfig::default();
        cfg.reseed_interval_secs = 0.0;
        assert!(cfg.validate().is_err());
    }
}
