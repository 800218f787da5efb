//! Cooperative shutdown handle shared across worker, refresher, and pump
//! threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloneable handle threads check between rounds / reads / writes.
///
/// Setting it does not itself wake anyone blocked on a `DropOldestQueue`
/// pop; callers that own a queue also call `wake_all` on it so blocked
/// threads notice the shutdown within the grace period instead of waiting
/// indefinitely for the next push.
#[derive(Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn signal(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_signaled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unsignaled() {
        let t = ShutdownToken::new();
        assert!(!t.is_signaled());
    }

    #[test]
    fn signal_is_visible_through_clones() {
        let t = ShutdownToken::new();
        let clone = t.clone();
        clone.signal();
        assert!(t.is_signaled());
    }
}
