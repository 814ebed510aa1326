//! Time source for the escalation engine and the pointer glide.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock with a blocking sleep.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by `Instant::now` and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Hand-driven clock for tests. Sleeping advances time instead of blocking.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: std::sync::Mutex<Duration>,
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            offset: std::sync::Mutex::new(Duration::ZERO),
            sleeps: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Jump to `at` past the clock's origin.
    pub fn set(&self, at: Duration) {
        *self.offset.lock().unwrap() = at;
    }

    pub fn set_secs(&self, secs: u64) {
        self.set(Duration::from_secs(secs));
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn clear_sleeps(&self) {
        self.sleeps.lock().unwrap().clear();
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        *self.offset.lock().unwrap() += duration;
    }
}
