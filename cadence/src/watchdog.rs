/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cycle budget monitoring.
//!
//! [`CycleWatchdog`] splits one scheduler cycle into named *epochs* and
//! compares the cycle's total time against the configured period.  An overrun
//! is a diagnostic, never a fault: the scheduler logs an [`OverrunReport`] and
//! carries on with the next cycle.
//!
//! ```text
//! reset ─► add_epoch("arm.periodic()") ─► add_epoch("triggers.poll()") ─► … ─► disable ─► is_expired?
//!   │            │                              │
//!   t0           t1 (elapsed t1-t0)             t2 (elapsed t2-t1)
//! ```

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;

use crate::clock::Clock;

/// Default loop period: 20 ms (50 Hz control loop).
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(20);

/// One named, timed segment of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Epoch {
    pub label: String,
    /// Time since the previous epoch (or since `reset` for the first one).
    pub elapsed: Duration,
}

/// Everything recorded during a cycle that exceeded its budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrunReport {
    pub period: Duration,
    pub elapsed: Duration,
    pub epochs: Vec<Epoch>,
}

impl fmt::Display for OverrunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loop time of {:.6}s overran period of {:.6}s",
            self.elapsed.as_secs_f64(),
            self.period.as_secs_f64()
        )?;
        for epoch in &self.epochs {
            write!(f, "\n\t{}: {:.6}s", epoch.label, epoch.elapsed.as_secs_f64())?;
        }
        Ok(())
    }
}

/// Accumulates epochs across one cycle and flags overruns against a timeout.
pub struct CycleWatchdog {
    clock: Rc<dyn Clock>,
    timeout: Duration,
    started: Duration,
    last_epoch: Duration,
    /// Total cycle time frozen by `disable`; `None` while recording.
    frozen: Option<Duration>,
    epochs: Vec<Epoch>,
}

impl CycleWatchdog {
    pub fn new(timeout: Duration, clock: Rc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            timeout,
            started: now,
            last_epoch: now,
            frozen: None,
            epochs: Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Start a new cycle: forget all epochs and restart the stopwatch.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.started = now;
        self.last_epoch = now;
        self.frozen = None;
        self.epochs.clear();
    }

    /// Record the time since the previous epoch under `label`.  No-op once
    /// the watchdog is disabled.
    pub fn add_epoch(&mut self, label: impl Into<String>) {
        if self.frozen.is_some() {
            return;
        }
        let now = self.clock.now();
        self.epochs.push(Epoch {
            label: label.into(),
            elapsed: now.saturating_sub(self.last_epoch),
        });
        self.last_epoch = now;
    }

    /// Stop recording and freeze the cycle's total time, so reporting work is
    /// not counted against the budget.
    pub fn disable(&mut self) {
        if self.frozen.is_none() {
            self.frozen = Some(self.clock.now().saturating_sub(self.started));
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.frozen.is_none()
    }

    /// Total time of the current cycle: frozen if disabled, live otherwise.
    pub fn elapsed(&self) -> Duration {
        self.frozen
            .unwrap_or_else(|| self.clock.now().saturating_sub(self.started))
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.timeout
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn report(&self) -> OverrunReport {
        OverrunReport {
            period: self.timeout,
            elapsed: self.elapsed(),
            epochs: self.epochs.clone(),
        }
    }
}

impl fmt::Debug for CycleWatchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleWatchdog")
            .field("timeout", &self.timeout)
            .field("enabled", &self.is_enabled())
            .field("epochs", &self.epochs.len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
