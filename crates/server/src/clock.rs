//! Wall-clock source injected into the service.

use std::sync::atomic::{AtomicU64, Ordering};

use grove_core::Millis;

/// Source of "now" for every action.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Millis;
}

/// Real time from the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        Millis(chrono::Utc::now().timestamp_millis().max(0) as u64)
    }
}

/// Hand-driven clock for scripts and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Clock frozen at `start`.
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU64::new(start.0),
        }
    }

    /// Jump to `at`; earlier instants are ignored.
    pub fn set(&self, at: Millis) {
        self.now.fetch_max(at.0, Ordering::SeqCst);
    }

    /// Move forward by `delta` milliseconds.
    pub fn advance(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.now.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_forward() {
        let clock = ManualClock::new(Millis(100));
        clock.advance(50);
        assert_eq!(clock.now(), Millis(150));
        clock.set(Millis(120));
        assert_eq!(clock.now(), Millis(150));
        clock.set(Millis(400));
        assert_eq!(clock.now(), Millis(400));
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > Millis(1_577_836_800_000));
    }
}
