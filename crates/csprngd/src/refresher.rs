//! Seed refresher: periodically reads a fresh 64-byte seed from the entropy
//! source and pushes it to the seed queue, never propagating a read failure
//! upward.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use csprng_core::{DropOldestQueue, Seed, ShutdownToken};
use tracing::{debug, warn};

const SEED_LEN: usize = 64;

/// Attempt a single 64-byte read from `seed_source`.
fn read_seed(seed_source: &Path) -> std::io::Result<Seed> {
    let mut file = std::fs::File::open(seed_source)?;
    let mut buf = [0u8; SEED_LEN];
    file.read_exact(&mut buf)?;
    Ok(Seed(buf))
}

/// Run until `shutdown` is signaled, attempting one read every
/// `reseed_interval / 2` and pushing successes to `seed_queue`
/// (drop-oldest). Failures are logged and retried on the next tick; the
/// generator workers never see them.
pub fn run(
    seed_source: std::path::PathBuf,
    seed_queue: Arc<DropOldestQueue<Seed>>,
    reseed_interval: Duration,
    shutdown: ShutdownToken,
) {
    let tick = reseed_interval / 2;
    loop {
        if shutdown.is_signaled() {
            debug!("seed refresher shutting down");
            return;
        }

        match read_seed(&seed_source) {
            Ok(seed) => {
                if let Some(evicted) = seed_queue.push(seed) {
                    drop(evicted);
                }
            }
            Err(e) => warn!(path = %seed_source.display(), error = %e, "seed read failed, retrying next tick"),
        }

        std::thread::sleep(tick);
    }
}
