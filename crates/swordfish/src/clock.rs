//! Clocks for polling intervals and retry backoff.

#![allow(missing_docs)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Clock interface used for every blocking wait.
pub trait Clock: Send + Sync + 'static {
    /// Time elapsed since the clock started.
    fn now(&self) -> Duration;

    /// Block until the given deadline.
    fn sleep_until(&self, deadline: Duration);

    /// Block for `delta`.
    fn sleep(&self, delta: Duration) {
        let deadline = self.now().saturating_add(delta);
        self.sleep_until(deadline);
    }
}

/// Monotonic clock based on `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep_until(&self, deadline: Duration) {
        let delta = deadline.saturating_sub(self.now());
        if delta.is_zero() {
            return;
        }
        thread::sleep(delta);
    }
}

#[derive(Debug, Default)]
struct ManualClockState {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// Deterministic clock for tests: sleeping jumps virtual time to the deadline.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockState>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[must_use]
    pub fn current_time(&self) -> Duration {
        self.inner.lock().expect("manual clock lock poisoned").now
    }

    /// Number of sleep calls issued to this clock.
    #[must_use]
    pub fn sleep_calls(&self) -> usize {
        self.inner
            .lock()
            .expect("manual clock lock poisoned")
            .sleeps
            .len()
    }

    /// Every slept duration, in call order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .expect("manual clock lock poisoned")
            .sleeps
            .clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.current_time()
    }

    fn sleep_until(&self, deadline: Duration) {
        let mut state = self.inner.lock().expect("manual clock lock poisoned");
        let delta = deadline.saturating_sub(state.now);
        state.sleeps.push(delta);
        if deadline > state.now {
            state.now = deadline;
        }
    }
}
