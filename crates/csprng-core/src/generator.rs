//! The generator worker: round expansion, key derivation, and the long-
//! running loop that ties a [`GeneratorState`] to the seed and data queues.
//!
//! # On `ITER`
//!
//! The nominal iteration count quoted for a round is 48, halved once up
//! front and halved again implicitly by an exclusive loop bound, leaving
//! `ITER / 2 - 1` cipher invocations actually executed per round. This is
//! not a bug to "fix": downstream nonce sequences, the key-derivation
//! indices, and the golden test vectors are all defined in terms of the
//! *effective* count. See `DESIGN.md` for the full reconciliation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};
use zeroize::Zeroize;

use crate::config::RunnerConfig;
use crate::crypto::{stream, xor};
use crate::entropy::EntropyProvider;
use crate::queue::DropOldestQueue;
use crate::shutdown::ShutdownToken;

/// Nominal iteration constant quoted in the external design. See the
/// module doc comment: the effective per-round count is derived from this,
/// not equal to it.
pub const ITER: u32 = 24;

/// Effective cipher invocations per round: `ITER / 2 - 1`. Canonically 11.
pub const ROUND_ITERS: usize = (ITER / 2 - 1) as usize;

/// Iteration (1-indexed) at which in-round key mutation happens: `ITER / 4`.
/// Canonically 6.
pub const MUTATE_AT: u32 = ITER / 4;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// A contiguous run of output bytes produced by one generator round.
pub type OutputBlock = Vec<u8>;

/// A freshly fetched 512-bit seed, split into key and state halves on use.
#[derive(Clone)]
pub struct Seed(pub [u8; 64]);

impl Seed {
    /// Split into a 32-byte key and a 32-byte state, per the data model:
    /// the first half seeds the key, the second half seeds the state.
    fn split(&self) -> ([u8; KEY_LEN], [u8; KEY_LEN]) {
        let mut key = [0u8; KEY_LEN];
        let mut state = [0u8; KEY_LEN];
        key.copy_from_slice(&self.0[0..KEY_LEN]);
        state.copy_from_slice(&self.0[KEY_LEN..64]);
        (key, state)
    }
}

impl Drop for Seed {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Render iteration index `i` as the 12-byte zero-padded ASCII-decimal
/// nonce used for that iteration's cipher call.
pub fn ascii_decimal_12(i: u32) -> [u8; NONCE_LEN] {
    let s = format!("{:012}", i);
    let bytes = s.as_bytes();
    assert_eq!(bytes.len(), NONCE_LEN, "iteration index does not fit in a 12-digit nonce");
    let mut out = [0u8; NONCE_LEN];
    out.copy_from_slice(bytes);
    out
}

/// One generator worker's exclusively-owned state. Never shared across
/// workers or threads.
pub struct GeneratorState {
    key: [u8; KEY_LEN],
    prev_key: [u8; KEY_LEN],
    state: [u8; KEY_LEN],
    spare: Option<[u8; KEY_LEN]>,
    last_reseed: Instant,
}

impl GeneratorState {
    pub fn from_seed(seed: Seed) -> Self {
        let (key, state) = seed.split();
        Self {
            key,
            prev_key: [0u8; KEY_LEN],
            state,
            spare: None,
            last_reseed: Instant::now(),
        }
    }

    /// Replace `(key, state)` from a freshly fetched seed, resetting
    /// `prev_key` to zero and dropping `spare`. Invariant 7.
    fn reseed(&mut self, seed: Seed) {
        let (key, state) = seed.split();
        self.key.zeroize();
        self.prev_key.zeroize();
        if let Some(mut spare) = self.spare.take() {
            spare.zeroize();
        }
        self.key = key;
        self.state = state;
        self.prev_key = [0u8; KEY_LEN];
        self.last_reseed = Instant::now();
    }

    /// Run one round: `ROUND_ITERS` cipher iterations, key mutation at
    /// `MUTATE_AT`, key derivation from `B[0]`/`B[2]`, and state advance
    /// from the final two round blocks.
    ///
    /// `emit_keystr` selects between the secure default (only `state`
    /// blocks are published) and the insecure backdoor mode (interleaved
    /// `(state, keystr)` pairs are published, see `SPEC_FULL.md` §4.5).
    pub fn run_round(
        &mut self,
        entropy: &mut dyn EntropyProvider,
        prediction_resistant: bool,
        emit_keystr: bool,
    ) -> OutputBlock {
        // B holds interleaved (state_i, keystr_i) pairs for all effective
        // iterations, regardless of emit_keystr: key derivation always
        // needs the data-block positions in this pair-stream, and keystr
        // is retained as internal-only state when emission is disabled.
        let mut blocks: Vec<[u8; KEY_LEN]> = Vec::with_capacity(ROUND_ITERS * 2);

        for i in 1..=ROUND_ITERS as u32 {
            let nonce = ascii_decimal_12(i);

            if prediction_resistant {
                let fresh = entropy.fetch32();
                self.state = xor_into(&fresh, &self.state);
            }

            let ciphered = stream(&self.key, &nonce, &self.state);
            self.state.copy_from_slice(&ciphered);

            // keystr = xor(concat(key, prev_key), state), truncated to the
            // 32-byte canonical width: the first 32 bytes of the 64-byte
            // concatenation are exactly `key`, so this reduces to
            // xor(key, state). This is the documented backdoor: an
            // observer of (state_i, keystr_i) recovers `key` by XOR.
            let keystr = xor_into(&self.key, &self.state);

            if i == MUTATE_AT {
                if let Some(spare) = self.spare.take() {
                    self.prev_key = self.key;
                    let mutated = xor_into(&self.key, &spare);
                    self.key.zeroize();
                    self.key = mutated;
                    let mut spare = spare;
                    spare.zeroize();
                }
            }

            blocks.push(self.state);
            blocks.push(keystr);
        }

        // Key derivation: new_key = new_spare = xor(B[0], B[2]), the two
        // data-block positions in the pair-stream. B[1] is deliberately
        // unused (see DESIGN.md Open Question resolution).
        self.prev_key = self.key;
        let derived = xor_into(&blocks[0], &blocks[2]);
        self.key.zeroize();
        self.key = derived;
        self.spare = Some(derived);

        // Publish: all of B except the first two and last two blocks.
        let middle = &blocks[2..blocks.len() - 2];
        let output: OutputBlock = if emit_keystr {
            middle.iter().flatten().copied().collect()
        } else {
            middle
                .iter()
                .step_by(2) // even absolute indices within `middle` are data blocks
                .flatten()
                .copied()
                .collect()
        };

        // State advance: XOR of the final two round blocks.
        let last = blocks.len() - 1;
        self.state = xor_into(&blocks[last], &blocks[last - 1]);

        blocks.zeroize();
        trace!(mutated = self.spare.is_some(), "round complete");
        output
    }

    /// True if enough time has elapsed since the last reseed to attempt one.
    fn due_for_reseed(&self, reseed_interval: Duration) -> bool {
        self.last_reseed.elapsed() > reseed_interval
    }
}

fn xor_into(a: &[u8], b: &[u8]) -> [u8; KEY_LEN] {
    let mut out = [0u8; KEY_LEN];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a.get(i).copied().unwrap_or(0) ^ b.get(i).copied().unwrap_or(0);
    }
    out
}

/// Owns one [`GeneratorState`] plus the queues and policy it needs to run
/// as a long-lived worker thread.
pub struct GeneratorWorker {
    state: GeneratorState,
    seed_queue: Arc<DropOldestQueue<Seed>>,
    data_queue: Arc<DropOldestQueue<OutputBlock>>,
    entropy: Box<dyn EntropyProvider>,
    config: RunnerConfig,
    shutdown: ShutdownToken,
}

impl GeneratorWorker {
    pub fn new(
        initial_seed: Seed,
        seed_queue: Arc<DropOldestQueue<Seed>>,
        data_queue: Arc<DropOldestQueue<OutputBlock>>,
        entropy: Box<dyn EntropyProvider>,
        config: RunnerConfig,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            state: GeneratorState::from_seed(initial_seed),
            seed_queue,
            data_queue,
            entropy,
            config,
            shutdown,
        }
    }

    /// Run rounds until `shutdown` is signaled. Each round's output is
    /// pushed to the data queue (drop-oldest on overflow); a reseed is
    /// attempted at most once per round, at the round boundary only.
    pub fn run(mut self) {
        let reseed_interval = self.config.reseed_interval();
        loop {
            if self.shutdown.is_signaled() {
                debug!("generator worker shutting down at round boundary");
                return;
            }

            let output = self.state.run_round(
                self.entropy.as_mut(),
                self.config.prediction_resistant,
                self.config.emit_keystr,
            );

            if let Some(evicted) = self.data_queue.push(output) {
                drop(evicted);
            }

            if self.state.due_for_reseed(reseed_interval) && !self.seed_queue.is_empty() {
                match self.seed_queue.pop_timeout(Duration::from_millis(100)) {
                    Some(seed) => self.state.reseed(seed),
                    None => debug!("reseed attempt timed out; continuing with current key"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::Disabled;

    fn seed_from_byte(b: u8) -> Seed {
        Seed([b; 64])
    }

    #[test]
    fn nonce_is_12_ascii_digits() {
        for i in 1..=ROUND_ITERS as u32 {
            let nonce = ascii_decimal_12(i);
            assert_eq!(nonce.len(), NONCE_LEN);
            for b in nonce {
                assert!(b.is_ascii_digit());
            }
            let parsed: u32 = std::str::from_utf8(&nonce).unwrap().parse().unwrap();
            assert_eq!(parsed, i);
        }
    }

    #[test]
    fn nonce_sequence_matches_s2() {
        let expected = [
            "000000000001",
            "000000000002",
            "000000000003",
            "000000000004",
            "000000000005",
            "000000000006",
            "000000000007",
            "000000000008",
            "000000000009",
            "000000000010",
            "000000000011",
        ];
        assert_eq!(ROUND_ITERS, expected.len());
        for (i, expected_nonce) in expected.iter().enumerate() {
            let nonce = ascii_decimal_12((i + 1) as u32);
            assert_eq!(std::str::from_utf8(&nonce).unwrap(), *expected_nonce);
        }
    }

    // Note on the externally documented 640-byte length property: that
    // figure and the 11-nonce sequence asserted by `nonce_sequence_matches_s2`
    // above cannot both hold under one reading of the round structure — 640
    // bytes requires 20 middle blocks from 12 iterations, while an 11-nonce
    // sequence yields 22 internal blocks and an 18-block middle slice. This
    // implementation keeps the 11-iteration reading (see DESIGN.md); the
    // lengths below are its actual, consistent output sizes and are not a
    // stand-in for the unsatisfiable 640-byte figure.
    #[test]
    fn round_output_length_is_conserved() {
        let mut state = GeneratorState::from_seed(seed_from_byte(0x11));
        let mut entropy = Disabled;
        let secure = state.run_round(&mut entropy, false, false);
        // 11 iterations -> 22 internal blocks; middle = blocks[2..20] (18
        // blocks); secure mode keeps only the 9 data blocks among them.
        assert_eq!(secure.len(), 9 * KEY_LEN);

        let mut state2 = GeneratorState::from_seed(seed_from_byte(0x11));
        let insecure = state2.run_round(&mut entropy, false, true);
        assert_eq!(insecure.len(), 18 * KEY_LEN);
    }

    #[test]
    fn same_seed_same_config_is_deterministic() {
        let mut entropy1 = Disabled;
        let mut entropy2 = Disabled;
        let mut a = GeneratorState::from_seed(seed_from_byte(0x42));
        let mut b = GeneratorState::from_seed(seed_from_byte(0x42));

        for _ in 0..4 {
            let out_a = a.run_round(&mut entropy1, false, false);
            let out_b = b.run_round(&mut entropy2, false, false);
            assert_eq!(out_a, out_b);
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut entropy = Disabled;
        let mut a = GeneratorState::from_seed(seed_from_byte(0x01));
        let mut b = GeneratorState::from_seed(seed_from_byte(0x02));
        assert_ne!(
            a.run_round(&mut entropy, false, false),
            b.run_round(&mut entropy, false, false)
        );
    }

    #[test]
    fn reseed_is_independent_of_prior_round() {
        // S4: round 2's first byte after a reseed to seed B matches a
        // fresh generator started directly from seed B.
        let mut entropy = Disabled;
        let mut worker_state = GeneratorState::from_seed(seed_from_byte(0xAA));
        let _round1 = worker_state.run_round(&mut entropy, false, false);
        worker_state.reseed(seed_from_byte(0xBB));
        let round2 = worker_state.run_round(&mut entropy, false, false);

        let mut fresh = GeneratorState::from_seed(seed_from_byte(0xBB));
        let fresh_round = fresh.run_round(&mut entropy, false, false);

        assert_eq!(round2, fresh_round);
    }
}
