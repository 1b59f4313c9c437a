use std::{
    cell::Cell,
    rc::Rc,
    time::Duration
};

/// Monotonic time source for frame stamps and input stamps.
pub trait Clock {
    /// Time elapsed since the clock's own epoch.
    fn now(&self) -> Duration;
}

/// Wall clock backed by `std::time::Instant`.
#[derive(Debug)]
pub struct SystemClock {
    epoch: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { epoch: std::time::Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

#[cfg(not(target_arch = "wasm32"))]
/// Follows tokio's timer, so it obeys `tokio::time::pause`.
#[derive(Debug)]
pub struct TokioClock {
    epoch: tokio::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl TokioClock {
    pub fn new() -> Self {
        Self { epoch: tokio::time::Instant::now() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[test]
fn test_manual_clock_clones_share_time() {
    let clock = ManualClock::new();
    let handle = clock.clone();
    handle.advance(Duration::from_millis(16));
    handle.advance(Duration::from_millis(4));
    assert_eq!(clock.now(), Duration::from_millis(20));

    clock.set(Duration::from_secs(1));
    assert_eq!(handle.now(), Duration::from_secs(1));
}

#[test]
fn test_system_clock_is_monotonic() {
    let clock = SystemClock::new();
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
