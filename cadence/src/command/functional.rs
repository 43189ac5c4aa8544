/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Stock commands built from closures, plus a clock-driven wait.

use std::rc::Rc;
use std::time::Duration;

use crate::clock::Clock;
use crate::subsystem::SubsystemHandle;

use super::{Command, Requirements};

// ── FunctionalCommand ─────────────────────────────────────────────────────────

/// A command whose lifecycle hooks are closures.
///
/// ```rust
/// use cadence::command::{CommandHandle, FunctionalCommand};
///
/// let mut ticks = 0;
/// let cmd = FunctionalCommand::new("count_to_three")
///     .on_execute(move || ticks += 1)
///     .until({
///         let mut polls = 0;
///         move || { polls += 1; polls >= 3 }
///     });
/// let handle = CommandHandle::new(cmd);
/// assert_eq!(handle.name(), "count_to_three");
/// ```
pub struct FunctionalCommand {
    name: String,
    on_initialize: Box<dyn FnMut()>,
    on_execute: Box<dyn FnMut()>,
    on_end: Box<dyn FnMut(bool)>,
    is_finished: Box<dyn FnMut() -> bool>,
    requirements: Requirements,
    runs_when_disabled: bool,
}

impl FunctionalCommand {
    /// A never-finishing command that does nothing until hooks are attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_initialize: Box::new(|| {}),
            on_execute: Box::new(|| {}),
            on_end: Box::new(|_| {}),
            is_finished: Box::new(|| false),
            requirements: Requirements::new(),
            runs_when_disabled: false,
        }
    }

    pub fn on_initialize(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_initialize = Box::new(f);
        self
    }

    pub fn on_execute(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_execute = Box::new(f);
        self
    }

    pub fn on_end(mut self, f: impl FnMut(bool) + 'static) -> Self {
        self.on_end = Box::new(f);
        self
    }

    /// Finish condition, polled after every `execute`.
    pub fn until(mut self, f: impl FnMut() -> bool + 'static) -> Self {
        self.is_finished = Box::new(f);
        self
    }

    pub fn requiring(mut self, subsystem: &SubsystemHandle) -> Self {
        self.requirements.insert(subsystem.id());
        self
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements.extend(requirements);
        self
    }

    pub fn runs_when_disabled(mut self, runs: bool) -> Self {
        self.runs_when_disabled = runs;
        self
    }
}

impl Command for FunctionalCommand {
    fn initialize(&mut self) {
        (self.on_initialize)();
    }

    fn execute(&mut self) {
        (self.on_execute)();
    }

    fn is_finished(&mut self) -> bool {
        (self.is_finished)()
    }

    fn end(&mut self, interrupted: bool) {
        (self.on_end)(interrupted);
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }

    fn runs_when_disabled(&self) -> bool {
        self.runs_when_disabled
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A command that runs `action` once on initialize and finishes on its first
/// poll.
pub fn instant(name: impl Into<String>, action: impl FnMut() + 'static) -> FunctionalCommand {
    FunctionalCommand::new(name)
        .on_initialize(action)
        .until(|| true)
}

/// A command that runs `action` every cycle and never finishes on its own.
pub fn run(name: impl Into<String>, action: impl FnMut() + 'static) -> FunctionalCommand {
    FunctionalCommand::new(name).on_execute(action)
}

// ── WaitCommand ───────────────────────────────────────────────────────────────

/// Finishes once `duration` has elapsed on `clock` since it was initialized.
/// Requires nothing and runs when disabled.
pub struct WaitCommand {
    duration: Duration,
    clock: Rc<dyn Clock>,
    started: Duration,
}

impl WaitCommand {
    pub fn new(duration: Duration, clock: Rc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            duration,
            clock,
            started,
        }
    }
}

impl Command for WaitCommand {
    fn initialize(&mut self) {
        self.started = self.clock.now();
    }

    fn is_finished(&mut self) -> bool {
        self.clock.now().saturating_sub(self.started) >= self.duration
    }

    fn runs_when_disabled(&self) -> bool {
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
