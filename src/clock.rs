//! Time sources for bounding waits.
//!
//! The session only ever asks a clock two things: what time it is, and to
//! pause for a while between polls. Pacing decides which of the cheap
//! options is used between polls of a wait loop.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source with an advisory sleep.
pub trait Clock: Send + std::fmt::Debug {
    /// Current monotonic time.
    fn now(&self) -> Instant;

    /// Pause for roughly `duration`. Implementations may return early.
    fn sleep(&self, duration: Duration);

    /// Give up the rest of the current time slice.
    fn yield_now(&self) {
        std::thread::yield_now();
    }

    /// Time elapsed since `start`.
    fn elapsed_since(&self, start: Instant) -> Duration {
        self.now().saturating_duration_since(start)
    }
}

/// Wall clock backed by `std::time::Instant` and `std::thread::sleep`.
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

/// Deterministic clock for tests and simulations.
///
/// Time only moves when `sleep` or `advance` is called, plus an optional
/// fixed `tick` on every `now` so busy loops still make progress. Clones
/// share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    inner: Arc<Mutex<ManualClockState>>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    offset: Duration,
    tick: Duration,
    sleeps: usize,
}

impl ManualClock {
    /// A clock that stands still until told otherwise.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            inner: Arc::new(Mutex::new(ManualClockState::default())),
        }
    }

    /// A clock that advances by `tick` every time it is read.
    pub fn with_tick(tick: Duration) -> Self {
        let clock = Self::new();
        clock.inner.lock().tick = tick;
        clock
    }

    /// Move time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.inner.lock().offset += duration;
    }

    /// Total time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.lock().offset
    }

    /// Number of `sleep` calls made so far.
    pub fn sleep_count(&self) -> usize {
        self.inner.lock().sleeps
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let mut state = self.inner.lock();
        let now = self.origin + state.offset;
        let tick = state.tick;
        state.offset += tick;
        now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.inner.lock();
        state.offset += duration;
        state.sleeps += 1;
    }

    fn yield_now(&self) {}
}

/// What a wait loop does between two polls of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "interval_ms")]
pub enum Pacing {
    /// Poll again immediately.
    Spin,
    /// Yield the thread, then poll again.
    Yield,
    /// Sleep for the given number of milliseconds.
    Sleep(u64),
}

impl Default for Pacing {
    fn default() -> Self {
        Self::Sleep(1)
    }
}

impl Pacing {
    /// Apply this pacing once using `clock`.
    pub fn pause(self, clock: &dyn Clock) {
        match self {
            Self::Spin => {}
            Self::Yield => clock.yield_now(),
            Self::Sleep(ms) => clock.sleep(Duration::from_millis(ms)),
        }
    }
}
