//! Millisecond time keeping
//!
//! Time is never read from a global clock. Every operation takes `now` explicitly,
//! so the caller decides where time comes from (a monotonic timer on target,
//! a plain counter in tests).

/// Point in time with millisecond resolution; 32-bit so it wraps after ~49 days
pub type Instant = fugit::TimerInstantU32<1000>;
/// Span of time in milliseconds
pub type Duration = fugit::MillisDurationU32;

/// Construct [`Instant`] from milliseconds
pub const fn ms(ticks: u32) -> Instant {
    Instant::from_ticks(ticks)
}

/// Elapsed-since-mark timer
///
/// Comparison is done on wrapping difference, so it works correctly across
/// the 32-bit counter overflow as long as it is checked at least once per
/// half of the counter range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer {
    start: Instant,
    interval: Duration,
}

impl Timer {
    pub const fn new(interval: Duration, now: Instant) -> Self {
        Self { start: now, interval }
    }

    /// Start counting from `now`
    pub fn restart(&mut self, now: Instant) {
        self.start = now;
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        // `now` before `start` may only happen if someone passed a stale time value
        now.checked_duration_since(self.start)
            .unwrap_or(Duration::from_ticks(0))
    }

    /// Check if the interval has passed since last restart
    pub fn is_ready(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.interval
    }
}
