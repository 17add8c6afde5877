/**
 * The `beat()` capability the control engine pokes once per tick, plus one
 * concrete, process-local realization of the external watchdog: a thread
 * that kills the process if `beat()` stops arriving.
 *
 * Keeping `Heartbeat` a trait (rather than hard-wiring `ProcessHeartbeat`
 * into the engine) is what lets the engine's own tests run without a
 * watchdog thread at all, see `elevator::engine::tests::NullHeartbeat`.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::util::now_millis;

/***************************************/
/*             Public API              */
/***************************************/
pub trait Heartbeat: Send {
    /// Idempotent, cheap; called once per tick at the very end of the
    /// cycle (see SPEC_FULL.md §4.3, step 11).
    fn beat(&self);
}

/// A cheap `Arc<AtomicU64>` timestamp, paired with `spawn_watchdog` below.
#[derive(Clone)]
pub struct ProcessHeartbeat {
    last_beat_millis: Arc<AtomicU64>,
}

impl ProcessHeartbeat {
    pub fn new() -> ProcessHeartbeat {
        ProcessHeartbeat {
            last_beat_millis: Arc::new(AtomicU64::new(now_millis() as u64)),
        }
    }

    /// Spawns the watchdog thread and returns its handle. The watchdog
    /// polls the shared timestamp and kills the process once it has been
    /// stale for longer than `timeout`, the mechanism that turns a
    /// missed heartbeat (obstruction busy-loop, or repeated assertion
    /// restarts) into an actual process exit, as required by the
    /// restart-safety design.
    pub fn spawn_watchdog(&self, timeout: Duration, poll_interval: Duration) -> thread::JoinHandle<()> {
        let last_beat_millis = self.last_beat_millis.clone();
        thread::Builder::new()
            .name("heartbeat-watchdog".into())
            .spawn(move || loop {
                thread::sleep(poll_interval);
                let last = last_beat_millis.load(Ordering::Relaxed);
                let age = (now_millis() as u64).saturating_sub(last);
                if age > timeout.as_millis() as u64 {
                    error!(
                        "heartbeat stale for {}ms (threshold {}ms), killing process",
                        age,
                        timeout.as_millis()
                    );
                    std::process::exit(1);
                }
            })
            .expect("failed to spawn heartbeat watchdog thread")
    }
}

impl Default for ProcessHeartbeat {
    fn default() -> Self {
        ProcessHeartbeat::new()
    }
}

impl Heartbeat for ProcessHeartbeat {
    fn beat(&self) {
        self.last_beat_millis.store(now_millis() as u64, Ordering::Relaxed);
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beat_advances_the_timestamp() {
        let hb = ProcessHeartbeat::new();
        let before = hb.last_beat_millis.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(5));
        hb.beat();
        let after = hb.last_beat_millis.load(Ordering::Relaxed);
        assert!(after >= before);
    }

    #[test]
    fn watchdog_kills_process_is_not_exercised_here() {
        // The watchdog's process::exit path is intentionally untested in
        // a unit test (it would kill the test runner); it is exercised by
        // the running binary instead. This test only pins down that
        // constructing and beating a heartbeat does not itself spawn a
        // watchdog thread.
        let hb = ProcessHeartbeat::new();
        let start = Instant::now();
        hb.beat();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
