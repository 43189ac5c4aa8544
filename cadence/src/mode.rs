/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runtime-mode authority.
//!
//! The scheduler asks a [`RuntimeMode`] whether the control system is
//! currently disabled once per cycle and once per admission attempt.  It never
//! caches the answer.

use std::cell::Cell;

/// External predicate describing the control system's operating mode.
pub trait RuntimeMode {
    /// `true` while the control system is disabled.  Commands that do not
    /// run when disabled are refused admission and ended on the next cycle.
    fn is_disabled(&self) -> bool;

    /// `true` when running against simulated hardware.  Subsystem simulation
    /// hooks only run in this mode.
    fn is_simulation(&self) -> bool {
        false
    }
}

/// Interior-mutable [`RuntimeMode`] flipped by the driver (or a test).
#[derive(Debug, Default)]
pub struct ModeSwitch {
    disabled: Cell<bool>,
    simulation: Cell<bool>,
}

impl ModeSwitch {
    /// An enabled, non-simulated mode.
    pub fn enabled() -> Self {
        Self::default()
    }

    /// An enabled mode that reports simulation.
    pub fn simulated() -> Self {
        let mode = Self::default();
        mode.simulation.set(true);
        mode
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }

    pub fn set_simulation(&self, simulation: bool) {
        self.simulation.set(simulation);
    }
}

impl RuntimeMode for ModeSwitch {
    fn is_disabled(&self) -> bool {
        self.disabled.get()
    }

    fn is_simulation(&self) -> bool {
        self.simulation.get()
    }
}
