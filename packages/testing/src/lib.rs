#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for the tests, benches and examples of the `sweep_bench` workspace.

use std::env;
use std::panic;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Environment variable that disables the watchdog when set to `1`.
const MUTATION_TESTING_VAR: &str = "MUTATION_TESTING";

/// Runs `test_fn` on a separate thread and fails the test if it does not finish in time.
///
/// Benchmark tests start worker threads that coordinate with each other. A bug in that
/// coordination shows up as a hang, which this turns into a test failure.
///
/// The limit is 30 seconds, or 120 seconds under Miri. A panic in `test_fn` is propagated to the
/// caller unchanged.
///
/// Setting the `MUTATION_TESTING` environment variable to `1` disables the watchdog and runs
/// `test_fn` directly, so that mutation testing can detect mutants that hang.
///
/// # Panics
///
/// Panics if `test_fn` panics or exceeds the time limit.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| (1..=10).sum::<u32>());
/// assert_eq!(sum, 55);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if env::var(MUTATION_TESTING_VAR).as_deref() == Ok("1") {
        return test_fn();
    }

    let limit = if cfg!(miri) {
        Duration::from_secs(120)
    } else {
        Duration::from_secs(30)
    };

    let (result_tx, result_rx) = mpsc::channel();

    let test_thread = thread::spawn(move || {
        // The receiver is gone if the watchdog already fired.
        drop(result_tx.send(test_fn()));
    });

    match result_rx.recv_timeout(limit) {
        Ok(result) => {
            if let Err(payload) = test_thread.join() {
                panic::resume_unwind(payload);
            }

            result
        }
        Err(RecvTimeoutError::Timeout) => {
            panic!("test did not complete within {limit:?}");
        }
        Err(RecvTimeoutError::Disconnected) => match test_thread.join() {
            Err(payload) => panic::resume_unwind(payload),
            Ok(()) => panic!("test thread exited without producing a result"),
        },
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn returns_value_of_fast_test() {
        assert_eq!(with_watchdog(|| 7 * 6), 42);
    }

    #[test]
    #[should_panic(expected = "inner failure")]
    fn propagates_panic_from_test() {
        with_watchdog::<_, ()>(|| panic!("inner failure"));
    }
}
