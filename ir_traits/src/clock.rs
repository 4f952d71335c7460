use std::thread;
use std::time::{Duration, Instant};

/// Source of time for the fixed delays of a calibration session (startup,
/// settle, per-sample interval). Real hardware uses [`MonotonicClock`];
/// tests use [`test_clock::TestClock`] so a full sweep runs instantly.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    #[inline]
    fn delay_ms(&self, ms: u64) {
        if ms > 0 {
            self.sleep(Duration::from_millis(ms));
        }
    }
}

/// Wall-clock delays via `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        thread::sleep(d);
    }
}

pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Virtual clock: `sleep` records the duration and moves `now` forward
    /// without blocking. Clones share the same timeline.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                slept: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Every duration passed to `sleep`, in call order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().map(|g| g.clone()).unwrap_or_default()
        }

        /// Sum of all recorded sleeps.
        pub fn elapsed(&self) -> Duration {
            self.sleeps().iter().sum()
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            if let Ok(mut log) = self.slept.lock() {
                log.push(d);
            }
        }
    }
}
