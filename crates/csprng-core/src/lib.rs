//! Core types for `csprngd`: the ChaCha20-based expansion generator, its
//! crypto primitive, the bounded drop-oldest queue shared by the seed and
//! data paths, and the configuration/shutdown plumbing every component is
//! built on.
//!
//! This is an experimental pseudorandom byte generator. It is not a
//! standards-compliant DRBG, makes no IND-CPA or forward-secrecy claim,
//! and does not authenticate its seed source. See `SPEC_FULL.md` and
//! `DESIGN.md` at the workspace root for the full design rationale.

pub mod config;
pub mod crypto;
pub mod entropy;
pub mod error;
pub mod generator;
pub mod queue;
pub mod shutdown;

pub use config::RunnerConfig;
pub use error::CsprngError;
pub use generator::{GeneratorState, GeneratorWorker, OutputBlock, Seed, ITER, MUTATE_AT, ROUND_ITERS};
pub use queue::DropOldestQueue;
pub use shutdown::ShutdownToken;
