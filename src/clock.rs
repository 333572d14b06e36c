//! Clock abstraction used by admission control and request timing.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of monotonic instants.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by `Instant::now`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Starts at the instant it was created and advances through `advance` or
/// `set_offset`.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += delta;
    }

    /// Places the clock at `offset` past its origin.
    ///
    /// Offsets earlier than the current one are ignored so the clock never
    /// goes backwards.
    pub fn set_offset(&self, offset: Duration) {
        let mut current = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        if offset > *current {
            *current = offset;
        }
    }

    /// The instant the clock started at.
    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_advances_only_on_request() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), clock.origin());

        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now(), clock.origin() + Duration::from_millis(500));

        clock.set_offset(Duration::from_millis(1100));
        assert_eq!(clock.now(), clock.origin() + Duration::from_millis(1100));
    }

    #[test]
    fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::new();
        clock.set_offset(Duration::from_secs(2));
        clock.set_offset(Duration::from_secs(1));
        assert_eq!(clock.now(), clock.origin() + Duration::from_secs(2));
    }
}
