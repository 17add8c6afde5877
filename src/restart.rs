/**
 * Restart-on-panic supervision, standing in for the reference
 * implementation's `restartWrapper` (built on `wibble::raii` there; here,
 * `std::panic::catch_unwind`).
 *
 * An assertion failure inside the control loop (`ElevatorState::assert_consistency`,
 * a bounds check in `FloorSet`, ...) is a bug we'd rather recover from than
 * take the whole process down for: the reference design's answer is to
 * unwind just that one cab's loop and start it over from scratch. The
 * watchdog in `elevator::heartbeat` is what turns a *recurring* fault
 * (one that keeps panicking before it can beat again) into a process exit.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::error;
use std::panic::{self, AssertUnwindSafe};

/***************************************/
/*             Public API              */
/***************************************/

/// Runs `body` repeatedly, catching any panic and logging it, until it
/// returns normally (which only happens once `body` has itself observed
/// the termination request and returned).
pub fn supervise<F: FnMut()>(mut body: F) {
    loop {
        let result = panic::catch_unwind(AssertUnwindSafe(&mut body));
        match result {
            Ok(()) => return,
            Err(payload) => {
                error!("control loop panicked, restarting: {}", describe(&payload));
            }
        }
    }
}

fn describe(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn restarts_after_a_panic_and_then_returns() {
        let calls = Cell::new(0);
        supervise(|| {
            let n = calls.get() + 1;
            calls.set(n);
            if n < 3 {
                panic!("boom {}", n);
            }
        });
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn never_panicking_runs_exactly_once() {
        let calls = Cell::new(0);
        supervise(|| calls.set(calls.get() + 1));
        assert_eq!(calls.get(), 1);
    }
}
