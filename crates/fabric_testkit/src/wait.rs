//! Polling helpers for assertions on background threads.

use std::thread;
use std::time::{Duration, Instant};

/// Default upper bound for [`wait_until`].
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds or `timeout` elapses.
///
/// Returns the final value of the condition.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Asserts that `condition` holds within [`DEFAULT_WAIT`].
#[track_caller]
pub fn assert_eventually(what: &str, condition: impl FnMut() -> bool) {
    assert!(wait_until(DEFAULT_WAIT, condition), "timed out waiting for {what}");
}

/// Asserts that `condition` stays true for the whole of `period`.
#[track_caller]
pub fn assert_holds_for(what: &str, period: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + period;
    while Instant::now() < deadline {
        assert!(condition(), "{what} stopped holding");
        thread::sleep(Duration::from_millis(5));
    }
}
