/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Monotonic time sources.
//!
//! The scheduler never reads wall-clock time directly.  Everything that needs
//! a timestamp (the cycle watchdog, [`CommandState`] admission stamps,
//! [`WaitCommand`], debounced triggers) goes through a [`Clock`], so tests can
//! drive time by hand with a [`ManualClock`].
//!
//! [`CommandState`]: crate::scheduler::CommandState
//! [`WaitCommand`]: crate::command::WaitCommand

use std::cell::Cell;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// `now()` is the time elapsed since an arbitrary, fixed origin.  Successive
/// calls must never go backwards.
pub trait Clock {
    fn now(&self) -> Duration;
}

// ── MonotonicClock ────────────────────────────────────────────────────────────

/// [`Clock`] backed by [`std::time::Instant`].  The origin is the moment the
/// clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

// ── ManualClock ───────────────────────────────────────────────────────────────

/// [`Clock`] that only moves when told to.
///
/// Used by the simulated driver (one period per cycle) and throughout the
/// tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Jump to an absolute time.  Ignored if `to` is earlier than the current
    /// reading, so the clock stays monotonic.
    pub fn set(&self, to: Duration) {
        if to >= self.now.get() {
            self.now.set(to);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_starts_at_zero_and_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_millis(20));
        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(25));
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(2));
        clock.set(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(2));
    }

    #[test]
    fn monotonic_clock_is_non_decreasing() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
