//! Time sources for the coaching pipeline.
//!
//! Every timing decision in the session compares against an `Instant`
//! handed in by the caller; these are the ways a caller gets one.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Trait representing a monotonic time source.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Follows the tokio clock, so a paused test runtime drives it too.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimeSource;

impl TimeSource for TokioTimeSource {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Hand-advanced clock for replays and tests.
#[derive(Debug)]
pub struct ManualTimeSource {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }

    /// Jump to `elapsed` after the start; never moves backwards
    pub fn set_elapsed(&self, elapsed: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset = (*offset).max(elapsed);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|o| *o).unwrap_or_default()
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let start = Instant::now();
        let clock = ManualTimeSource::starting_at(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), start + Duration::from_millis(500));
    }

    #[test]
    fn manual_clock_is_monotonic() {
        let start = Instant::now();
        let clock = ManualTimeSource::starting_at(start);
        clock.set_elapsed(Duration::from_secs(2));
        clock.set_elapsed(Duration::from_secs(1));
        assert_eq!(clock.now(), start + Duration::from_secs(2));
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemTimeSource;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
