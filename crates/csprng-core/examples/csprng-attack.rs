//! Demonstrates the backdoor described for the insecure `emit_keystr`
//! configuration: an observer of the interleaved `(state, keystr)` stream
//! recovers the generator's key and uses it to predict an adjacent block.
//!
//! Mirrors `attack_backdoor.py`'s `try_nonces` search: recover
//! `key = xor(state, keystr)`, then brute-force the nonce in `1..ITER`
//! until `stream(key, nonce, state_i)` reproduces a known neighboring
//! block. Not wired into the daemon; run with
//! `cargo run --example csprng-attack`.

use csprng_core::crypto::{stream, xor};
use csprng_core::generator::{ascii_decimal_12, GeneratorState, Seed, ITER, MUTATE_AT};

fn main() {
    let seed = Seed([0x5Eu8; 64]);
    let mut state = GeneratorState::from_seed(seed);
    let output = state.run_round(&mut csprng_core::entropy::Disabled, false, true);

    let blocks: Vec<&[u8]> = output.chunks(32).collect();
    println!("captured {} interleaved 32-byte blocks ({} bytes total)", blocks.len(), output.len());

    // The published stream covers iterations 2..=10 as (state_i, keystr_i)
    // pairs; iteration k sits at pair-stream positions 2*(k-2) and
    // 2*(k-2)+1. Pick two adjacent published iterations after MUTATE_AT so
    // their keys are provably identical.
    let attack_iter = MUTATE_AT + 1; // 7
    let next_iter = attack_iter + 1; // 8
    let state_i = blocks[(2 * (attack_iter - 2)) as usize];
    let keystr_i = blocks[(2 * (attack_iter - 2) + 1) as usize];
    let state_next = blocks[(2 * (next_iter - 2)) as usize];

    // key = xor(state, keystr), since keystr was published as xor(key, state).
    let recovered_key = xor(state_i, keystr_i);
    println!("recovered key candidate from iteration {attack_iter}: {}", hex(&recovered_key));

    let mut found = None;
    for n in 1..ITER {
        let nonce = ascii_decimal_12(n);
        let candidate = stream(&recovered_key, &nonce, state_i);
        if candidate == state_next {
            found = Some(n);
            break;
        }
    }

    match found {
        Some(n) => {
            println!(
                "recovered key correctly predicts block at iteration {next_iter} using nonce {n:012} (expected {next_iter})"
            );
            assert_eq!(n, next_iter, "recovered nonce should match the true iteration index");
        }
        None => {
            eprintln!("attack failed: no nonce in 1..{ITER} reproduced the known neighboring block");
            std::process::exit(1);
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
