//! Prediction-resistance entropy provider.
//!
//! Dispatch is chosen once at startup from the `prediction_resistant`
//! configuration flag (see Design Notes in SPEC_FULL.md: "process-wide
//! mutable state" is replaced by an explicit capability value carried into
//! the generator worker, not a global lookup).

use tracing::warn;

/// A source of 32 bytes of fresh entropy, used only for per-iteration
/// prediction-resistance mixing.
pub trait EntropyProvider: Send {
    fn fetch32(&mut self) -> [u8; 32];
}

/// Hardware RDRAND-backed provider, available only on `x86_64`.
#[cfg(target_arch = "x86_64")]
pub struct HardwareRng;

#[cfg(target_arch = "x86_64")]
impl HardwareRng {
    /// Returns `Some` if the CPU advertises the `rdrand` instruction.
    pub fn detect() -> Option<Self> {
        if std::is_x86_feature_detected!("rdrand") {
            Some(Self)
        } else {
            None
        }
    }
}

#[cfg(target_arch = "x86_64")]
impl EntropyProvider for HardwareRng {
    fn fetch32(&mut self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for chunk in out.chunks_exact_mut(8) {
            // SAFETY: guarded by `is_x86_feature_detected!("rdrand")` in
            // `detect`; `_rdrand64_step` is the only unsafe operation and
            // its only effect is writing to a local on success.
            let mut value: u64 = 0;
            let mut attempts = 0;
            loop {
                let ok = unsafe { core::arch::x86_64::_rdrand64_step(&mut value) };
                if ok == 1 || attempts >= 10 {
                    break;
                }
                attempts += 1;
            }
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }
}

/// OS CSPRNG fallback, used when no hardware RNG is available. Weaker than
/// the intended hardware-backed mode; the caller is expected to have logged
/// that already (see `choose`).
pub struct OsFallback;

impl EntropyProvider for OsFallback {
    fn fetch32(&mut self) -> [u8; 32] {
        let mut out = [0u8; 32];
        getrandom::getrandom(&mut out).expect("OS CSPRNG must be available");
        out
    }
}

/// No prediction resistance; `fetch32` is never called through this variant
/// in practice, since the generator only consults the provider when
/// `prediction_resistant` is enabled.
pub struct Disabled;

impl EntropyProvider for Disabled {
    fn fetch32(&mut self) -> [u8; 32] {
        [0u8; 32]
    }
}

/// Choose an entropy provider once at startup.
///
/// When `prediction_resistant` is `false`, returns `Disabled` without
/// probing for hardware support. When `true`, prefers `HardwareRng` and
/// falls back to the OS CSPRNG, logging the fallback as a weaker-than-
/// intended mode per the external interface contract.
pub fn choose(prediction_resistant: bool) -> Box<dyn EntropyProvider> {
    if !prediction_resistant {
        return Box::new(Disabled);
    }

    #[cfg(target_arch = "x86_64")]
    {
        if let Some(hw) = HardwareRng::detect() {
            return Box::new(hw);
        }
    }

    warn!("RDRAND unavailable; falling back to OS CSPRNG for prediction resistance (weaker than intended)");
    Box::new(OsFallback)
}
