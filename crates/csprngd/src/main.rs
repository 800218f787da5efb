//! `csprngd`: an experimental ChaCha20-based CSPRNG daemon.
//!
//! Wires together configuration loading, the initial seed fetch, N
//! generator workers, the seed refresher, and the output pump, all sharing
//! one [`ShutdownToken`] set from a `SIGINT`/`SIGTERM` handler.

mod cli;
mod error;
mod pump;
mod refresher;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use csprng_core::{entropy, DropOldestQueue, GeneratorWorker, Seed, ShutdownToken};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use error::AppError;

/// Set by the signal handler installed in `main`; polled once at startup by
/// nothing else — `install_signal_handler` drives `ShutdownToken` directly,
/// this flag only exists because `nix::sys::signal::signal` requires a
/// `'static` function pointer, not a closure capturing the token.
static SIGNAL_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_: i32) {
    SIGNAL_RECEIVED.store(true, Ordering::SeqCst);
}

/// Install a handler for `SIGINT`/`SIGTERM` that flips [`SIGNAL_RECEIVED`].
/// A dedicated thread bridges that flag to the cooperative [`ShutdownToken`]
/// so every other component keeps seeing a plain `Arc<AtomicBool>`-style
/// handle rather than reaching for signal state directly.
fn install_signal_handler(shutdown: ShutdownToken, seed_q: Arc<DropOldestQueue<Seed>>, data_q: Arc<DropOldestQueue<Vec<u8>>>) {
    use nix::sys::signal::{signal, SigHandler, Signal};

    unsafe {
        // SAFETY: handle_signal only performs an atomic store, which is
        // async-signal-safe.
        signal(Signal::SIGINT, SigHandler::Handler(handle_signal)).expect("install SIGINT handler");
        signal(Signal::SIGTERM, SigHandler::Handler(handle_signal)).expect("install SIGTERM handler");
    }

    std::thread::Builder::new()
        .name("signal-bridge".into())
        .spawn(move || loop {
            if SIGNAL_RECEIVED.load(Ordering::SeqCst) {
                info!("shutdown signal received");
                shutdown.signal();
                seed_q.wake_all();
                data_q.wake_all();
                return;
            }
            std::thread::sleep(Duration::from_millis(50));
        })
        .expect("spawn signal bridge thread");
}

fn fetch_initial_seed(seed_source: &std::path::Path) -> Result<Seed, AppError> {
    use std::io::Read;
    let mut file = std::fs::File::open(seed_source)
        .map_err(|e| csprng_core::CsprngError::SeedRead(64, seed_source.to_path_buf(), e))?;
    let mut buf = [0u8; 64];
    match file.read_exact(&mut buf) {
        Ok(()) => Ok(Seed(buf)),
        Err(e) => Err(csprng_core::CsprngError::SeedRead(64, seed_source.to_path_buf(), e).into()),
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = cli::build_config(&cli)?;
    info!(rng_threads = config.rng_threads, prediction_resistant = config.prediction_resistant, emit_keystr = config.emit_keystr, "configuration resolved");

    // Initial seed fetch is fatal: exit 1 if the entropy source cannot be
    // read at startup (the external interface contract has no fallback).
    let initial_seed = fetch_initial_seed(&config.seed_source)?;

    let seed_queue = Arc::new(DropOldestQueue::<Seed>::new(config.seed_queue_capacity()));
    let data_queue = Arc::new(DropOldestQueue::<Vec<u8>>::new(config.data_queue_capacity()));
    let shutdown = ShutdownToken::new();

    install_signal_handler(shutdown.clone(), seed_queue.clone(), data_queue.clone());

    let mut worker_handles = Vec::new();
    let mut support_handles = Vec::new();

    // Generator workers. Only the first gets the fetched initial seed
    // directly; the rest derive theirs from independent bytes of the same
    // seed material so no two workers start in lockstep. Each worker's
    // entropy provider is chosen independently per the capability pattern.
    for i in 0..config.rng_threads {
        let worker_seed = if i == 0 {
            initial_seed.clone()
        } else {
            let mut bytes = initial_seed.0;
            bytes[0] ^= i as u8;
            Seed(bytes)
        };
        let entropy_provider = entropy::choose(config.prediction_resistant);
        let worker = GeneratorWorker::new(
            worker_seed,
            seed_queue.clone(),
            data_queue.clone(),
            entropy_provider,
            config.clone(),
            shutdown.clone(),
        );
        let handle = std::thread::Builder::new()
            .name(format!("generator-{i}"))
            .spawn(move || worker.run())
            .expect("spawn generator worker thread");
        worker_handles.push(handle);
    }

    {
        let seed_source = config.seed_source.clone();
        let seed_queue = seed_queue.clone();
        let reseed_interval = config.reseed_interval();
        let shutdown = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("seed-refresher".into())
            .spawn(move || refresher::run(seed_source, seed_queue, reseed_interval, shutdown))
            .expect("spawn seed refresher thread");
        support_handles.push(handle);
    }

    let pump_result = pump::run(config.pipe_name.clone(), data_queue.clone(), shutdown.clone());

    shutdown.signal();
    seed_queue.wake_all();
    data_queue.wake_all();

    // A generator worker only panics on a cipher precondition violation
    // (crypto::stream's length asserts) — a fatal bug, not a recoverable
    // I/O condition, so it gets its own exit code rather than being folded
    // into AppError's 0/1 mapping.
    let mut worker_panicked = false;
    for handle in worker_handles {
        if handle.join().is_err() {
            error!("a generator worker panicked");
            worker_panicked = true;
        }
    }
    for handle in support_handles {
        if handle.join().is_err() {
            error!("a support thread (seed refresher) panicked");
        }
    }

    if worker_panicked {
        return Err(CipherPreconditionViolation.into());
    }

    pump_result
}

/// Sentinel carrying exit code 2 (fatal cipher precondition violation),
/// distinct from the 0/1 outcomes `AppError` otherwise maps to.
struct CipherPreconditionViolation;

impl From<CipherPreconditionViolation> for AppError {
    fn from(_: CipherPreconditionViolation) -> Self {
        AppError::CipherPrecondition
    }
}

fn main() {
    std::process::exit(match run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("csprngd: {e}");
            e.exit_code()
        }
    });
}
