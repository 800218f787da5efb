//! The crypto primitive wrapper: ChaCha20 keystream application and byte XOR.
//!
//! Both operations are pure. Precondition violations (wrong key or nonce
//! length) are programmer errors, not recoverable conditions, and are
//! surfaced as a panic rather than a `Result`.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;

/// Length in bytes of a ChaCha20 key.
pub const KEY_LEN: usize = 32;
/// Length in bytes of the nonce used by a single cipher invocation.
pub const NONCE_LEN: usize = 12;

/// Apply the ChaCha20 keystream to `input`, returning a buffer the same
/// length as `input`.
///
/// # Panics
/// Panics if `key.len() != 32` or `nonce.len() != 12`. Both are programmer
/// errors: every caller in this crate constructs keys and nonces of fixed
/// length, so a mismatch here means a logic bug upstream, not bad input from
/// an external source.
pub fn stream(key: &[u8], nonce: &[u8], input: &[u8]) -> Vec<u8> {
    assert_eq!(key.len(), KEY_LEN, "chacha20 key must be exactly 32 bytes");
    assert_eq!(nonce.len(), NONCE_LEN, "chacha20 nonce must be exactly 12 bytes");

    let mut output = input.to_vec();
    let mut cipher = ChaCha20::new(chacha20::Key::from_slice(key), chacha20::Nonce::from_slice(nonce));
    cipher.apply_keystream(&mut output);
    output
}

/// Byte-wise XOR of `a` and `b`, truncated to the shorter of the two inputs.
pub fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_preserves_length() {
        let key = [0u8; KEY_LEN];
        let nonce = [0u8; NONCE_LEN];
        let input = [1u8; 100];
        let out = stream(&key, &nonce, &input);
        assert_eq!(out.len(), input.len());
    }

    #[test]
    fn stream_is_deterministic() {
        let key = [7u8; KEY_LEN];
        let nonce = [3u8; NONCE_LEN];
        let input = [9u8; 32];
        assert_eq!(stream(&key, &nonce, &input), stream(&key, &nonce, &input));
    }

    #[test]
    #[should_panic(expected = "32 bytes")]
    fn stream_rejects_short_key() {
        let key = [0u8; 16];
        let nonce = [0u8; NONCE_LEN];
        stream(&key, &nonce, &[0u8; 8]);
    }

    #[test]
    #[should_panic(expected = "12 bytes")]
    fn stream_rejects_short_nonce() {
        let key = [0u8; KEY_LEN];
        let nonce = [0u8; 4];
        stream(&key, &nonce, &[0u8; 8]);
    }

    #[test]
    fn xor_truncates_to_shorter() {
        let a = [0xffu8; 5];
        let b = [0x0fu8; 3];
        assert_eq!(xor(&a, &b), vec![0xf0, 0xf0, 0xf0]);
    }
}
