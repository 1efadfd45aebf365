//! # Fence
//!
//! A resettable binary flag that threads can park on.
//!
//! The main loop uses two of these to hand the swap point back and forth
//! between the simulation and render threads. The stores themselves never
//! wait on a fence.

use parking_lot::{Condvar, Mutex};

/// Resettable, thread-observable boolean.
///
/// Waiters are parked on a condition variable, never spun. `signal()` and
/// `reset()` wake **all** waiters; each re-checks the flag and returns only
/// once it matches the state it asked for.
///
/// ## Usage
///
/// ```rust,ignore
/// let commit_ready = Fence::new(false);
///
/// // producer
/// commit_ready.signal();
///
/// // consumer
/// commit_ready.wait_signaled();
/// commit_ready.reset();
/// ```
#[derive(Debug)]
pub struct Fence {
    signaled: Mutex<bool>,
    changed: Condvar,
}

impl Fence {
    /// Creates a fence in the given initial state.
    #[must_use]
    pub fn new(signaled: bool) -> Self {
        Self {
            signaled: Mutex::new(signaled),
            changed: Condvar::new(),
        }
    }

    /// Sets the flag and releases every thread in [`Fence::wait_signaled`].
    pub fn signal(&self) {
        let mut guard = self.signaled.lock();
        *guard = true;
        self.changed.notify_all();
    }

    /// Clears the flag. Idempotent.
    pub fn reset(&self) {
        let mut guard = self.signaled.lock();
        if *guard {
            *guard = false;
            self.changed.notify_all();
        }
    }

    /// Non-blocking check.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }

    /// Parks the calling thread until the fence is signaled.
    pub fn wait_signaled(&self) {
        self.wait_for(true);
    }

    /// Parks the calling thread until the fence is reset.
    pub fn wait_not_signaled(&self) {
        self.wait_for(false);
    }

    fn wait_for(&self, state: bool) {
        let mut guard = self.signaled.lock();
        while *guard != state {
            self.changed.wait(&mut guard);
        }
    }
}

impl Default for Fence {
    /// Unsignaled.
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_initial_state() {
        assert!(!Fence::new(false).is_signaled());
        assert!(Fence::new(true).is_signaled());
        assert!(!Fence::default().is_signaled());
    }

    #[test]
    fn test_signal_and_reset() {
        let fence = Fence::new(false);
        fence.signal();
        assert!(fence.is_signaled());

        // Already signaled: returns immediately
        fence.wait_signaled();

        fence.reset();
        assert!(!fence.is_signaled());
        fence.reset();
        assert!(!fence.is_signaled());

        fence.wait_not_signaled();
    }

    #[test]
    fn test_signal_releases_all_waiters() {
        let fence = Arc::new(Fence::new(false));
        let released = Arc::new(AtomicUsize::new(0));

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let fence = Arc::clone(&fence);
                let released = Arc::clone(&released);
                thread::spawn(move || {
                    fence.wait_signaled();
                    released.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(released.load(Ordering::SeqCst), 0);

        fence.signal();
        for waiter in waiters {
            waiter.join().unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_reset_releases_not_signaled_waiter() {
        let fence = Arc::new(Fence::new(true));
        let waiter = {
            let fence = Arc::clone(&fence);
            thread::spawn(move || fence.wait_not_signaled())
        };

        thread::sleep(Duration::from_millis(10));
        fence.reset();
        waiter.join().unwrap();
    }

    #[test]
    fn test_ping_pong() {
        let ping = Arc::new(Fence::new(false));
        let pong = Arc::new(Fence::new(true));
        let rounds = 100;

        let other = {
            let (ping, pong) = (Arc::clone(&ping), Arc::clone(&pong));
            thread::spawn(move || {
                for _ in 0..rounds {
                    ping.wait_signaled();
                    ping.reset();
                    pong.signal();
                }
            })
        };

        for _ in 0..rounds {
            pong.wait_signaled();
            pong.reset();
            ping.signal();
        }
        other.join().unwrap();
        pong.wait_signaled();
    }
}
