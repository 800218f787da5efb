//! A bounded, drop-oldest queue.
//!
//! Replaces the "check `full()` then `get()`-then-`put()`" pattern with a
//! single `push` that performs the eviction atomically and hands the
//! evicted element back to the caller, so loss is observable and testable
//! rather than implicit.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A bounded queue that evicts the oldest element on overflow instead of
/// blocking the producer.
///
/// Shared by the seed queue (refresher → generator workers) and the data
/// queue (generator workers → output pump); both need the same drop-oldest
/// semantics, so the implementation lives here once.
pub struct DropOldestQueue<T> {
    capacity: usize,
    inner: Mutex<VecDeque<T>>,
    not_empty: Condvar,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push `item`, evicting the oldest element first if the queue is full.
    /// Returns the evicted element, if any. Never blocks.
    pub fn push(&self, item: T) -> Option<T> {
        let mut guard = self.inner.lock();
        let evicted = if guard.len() >= self.capacity {
            guard.pop_front()
        } else {
            None
        };
        guard.push_back(item);
        self.not_empty.notify_one();
        evicted
    }

    /// Pop the oldest element, blocking until one is available or `wake`
    /// is called (e.g. by a shutdown signal).
    pub fn pop_blocking(&self) -> Option<T> {
        let mut guard = self.inner.lock();
        loop {
            if let Some(item) = guard.pop_front() {
                return Some(item);
            }
            self.not_empty.wait(&mut guard);
        }
    }

    /// Pop the oldest element, waiting at most `timeout`. Returns `None` on
    /// timeout without blocking further.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut guard = self.inner.lock();
        if let Some(item) = guard.pop_front() {
            return Some(item);
        }
        let result = self.not_empty.wait_for(&mut guard, timeout);
        if result.timed_out() {
            return None;
        }
        guard.pop_front()
    }

    /// Pop the oldest element without waiting. Used by the pump's
    /// non-blocking poll between backoff iterations.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Wake every thread blocked in `pop_blocking`/`pop_timeout` without
    /// pushing an element. Used at shutdown so no thread waits past the
    /// grace period.
    pub fn wake_all(&self) {
        self.not_empty.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_under_capacity_evicts_nothing() {
        let q: DropOldestQueue<i32> = DropOldestQueue::new(4);
        assert_eq!(q.push(1), None);
        assert_eq!(q.push(2), None);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn overflow_evicts_oldest_and_keeps_push_order() {
        let q: DropOldestQueue<i32> = DropOldestQueue::new(100);
        for i in 0..101 {
            q.push(i);
        }
        let mut popped = Vec::new();
        while let Some(v) = q.try_pop() {
            popped.push(v);
        }
        // The first pushed element (0) is lost; the last 100 survive in
        // push order.
        let expected: Vec<i32> = (1..101).collect();
        assert_eq!(popped, expected);
    }

    #[test]
    fn pop_timeout_returns_none_when_empty() {
        let q: DropOldestQueue<i32> = DropOldestQueue::new(4);
        assert_eq!(q.pop_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn pop_timeout_returns_pushed_value() {
        let q: DropOldestQueue<i32> = DropOldestQueue::new(4);
        q.push(42);
        assert_eq!(q.pop_timeout(Duration::from_millis(10)), Some(42));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Drop-oldest invariant (spec property 5): after pushing more
        /// elements than capacity, the surviving elements are exactly the
        /// most-recently-pushed `cap` elements, in push order.
        #[test]
        fn surviving_elements_are_most_recent(
            cap in 1usize..50,
            pushes in 0usize..500,
        ) {
            let q: DropOldestQueue<usize> = DropOldestQueue::new(cap);
            for i in 0..pushes {
                q.push(i);
            }
            let mut popped = Vec::new();
            while let Some(v) = q.try_pop() {
                popped.push(v);
            }
            let expected_start = pushes.saturating_sub(cap);
            let expected: Vec<usize> = (expected_start..pushes).collect();
            prop_assert_eq!(popped, expected);
        }
    }
}
