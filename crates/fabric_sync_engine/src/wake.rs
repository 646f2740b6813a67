//! Coalescing wake signal.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A single-slot event shared by many producers and one consumer.
///
/// Setting the signal any number of times before it is consumed results in
/// exactly one successful wait.
#[derive(Debug, Default)]
pub struct WakeSignal {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl WakeSignal {
    /// Creates a cleared signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signal and wakes the consumer.
    pub fn set(&self) {
        let mut flag = self.flag.lock();
        *flag = true;
        self.cond.notify_one();
    }

    /// Returns true if the signal is set and not yet consumed.
    pub fn is_set(&self) -> bool {
        *self.flag.lock()
    }

    /// Clears the signal without waiting.
    pub fn clear(&self) {
        *self.flag.lock() = false;
    }

    /// Blocks until the signal is set, then clears it.
    pub fn wait(&self) {
        let mut flag = self.flag.lock();
        while !*flag {
            self.cond.wait(&mut flag);
        }
        *flag = false;
    }

    /// Waits up to `timeout` for the signal.
    ///
    /// Returns true and clears the signal if it was set in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut flag = self.flag.lock();
        while !*flag {
            if self.cond.wait_until(&mut flag, deadline).timed_out() {
                break;
            }
        }
        std::mem::replace(&mut *flag, false)
    }
}
