//! Output pump: owns the FIFO, pops blocks off the data queue, and writes
//! them in order. Recovers from a write failure by closing and reopening
//! the sink without losing the block that failed to write.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use csprng_core::{DropOldestQueue, OutputBlock, ShutdownToken};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tracing::{info, warn};

use crate::error::AppError;

/// The sink's explicit open/closed state, replacing exception-driven reopen
/// logic with a value every call site has to match on.
enum SinkState {
    Open(File),
    Closed,
}

/// Create the output FIFO at `path` if it does not already exist, mode
/// `0o600` (owner read/write only).
fn ensure_fifo(path: &Path) -> Result<(), AppError> {
    if path.exists() {
        return Ok(());
    }
    mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR)
        .map_err(|e| AppError::FifoCreate(path.to_path_buf(), std::io::Error::from(e)))
}

/// Open the FIFO for writing. Blocks until a reader attaches, per FIFO
/// semantics.
fn open_sink(path: &Path) -> Result<File, AppError> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| AppError::SinkOpen(path.to_path_buf(), e))
}

/// Run until `shutdown` is signaled, writing every block popped off
/// `data_queue` to the FIFO at `pipe_name`, reopening on write failure.
pub fn run(
    pipe_name: PathBuf,
    data_queue: Arc<DropOldestQueue<OutputBlock>>,
    shutdown: ShutdownToken,
) -> Result<(), AppError> {
    ensure_fifo(&pipe_name)?;
    let mut sink = SinkState::Open(open_sink(&pipe_name)?);
    info!(path = %pipe_name.display(), "output sink opened");

    loop {
        if shutdown.is_signaled() {
            return Ok(());
        }

        let block = match data_queue.pop_timeout(Duration::from_millis(200)) {
            Some(b) => b,
            None => continue,
        };

        loop {
            match &mut sink {
                SinkState::Open(file) => match file.write_all(&block) {
                    Ok(()) => break,
                    Err(e) => {
                        warn!(error = %e, "write to output sink failed, reopening");
                        sink = SinkState::Closed;
                    }
                },
                SinkState::Closed => match open_sink(&pipe_name) {
                    Ok(file) => {
                        info!("output sink reopened");
                        sink = SinkState::Open(file);
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to reopen output sink, retrying");
                        std::thread::sleep(Duration::from_millis(200));
                    }
                },
            }

            if shutdown.is_signaled() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_fifo_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe");
        ensure_fifo(&path).unwrap();
        assert!(path.exists());
        // Second call must not error just because the FIFO already exists.
        ensure_fifo(&path).unwrap();
    }
}
