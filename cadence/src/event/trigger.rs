/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Boolean conditions bound to an [`EventLoop`].
//!
//! A [`Trigger`] pairs a condition with the loop it binds into.  Triggers
//! compose (`negate`, `and`, `or`, `rising`, `falling`, `debounce`) into new
//! triggers on the same loop, and bind either raw actions
//! ([`if_high`](Trigger::if_high)) or command actions (`on_true`,
//! `while_true`, `toggle_on_true`, …).
//!
//! Command bindings call the scheduler directly: trigger polling runs before
//! the scheduler's active-command pass, so their requests apply immediately.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::warn;

use crate::clock::Clock;
use crate::command::CommandHandle;
use crate::scheduler::Scheduler;

use super::EventLoop;

type Condition = Rc<RefCell<dyn FnMut() -> bool>>;

/// A boolean condition polled by an [`EventLoop`].
#[derive(Clone)]
pub struct Trigger {
    event_loop: EventLoop,
    condition: Condition,
}

impl Trigger {
    pub fn new(event_loop: &EventLoop, condition: impl FnMut() -> bool + 'static) -> Self {
        Self {
            event_loop: event_loop.clone(),
            condition: Rc::new(RefCell::new(condition)),
        }
    }

    /// Evaluate the condition once.
    ///
    /// A condition that (indirectly) evaluates itself reads as `false`.
    pub fn get(&self) -> bool {
        evaluate(&self.condition)
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    fn derive(&self, condition: impl FnMut() -> bool + 'static) -> Trigger {
        Trigger::new(&self.event_loop, condition)
    }

    // ── Composition ───────────────────────────────────────────────────────────

    pub fn negate(&self) -> Trigger {
        let base = self.condition.clone();
        self.derive(move || !evaluate(&base))
    }

    /// Active when both are.  Short-circuits: `other` is not evaluated while
    /// `self` is false.
    pub fn and(&self, other: &Trigger) -> Trigger {
        let (a, b) = (self.condition.clone(), other.condition.clone());
        self.derive(move || evaluate(&a) && evaluate(&b))
    }

    /// Active when either is.  Short-circuits like [`and`](Self::and).
    pub fn or(&self, other: &Trigger) -> Trigger {
        let (a, b) = (self.condition.clone(), other.condition.clone());
        self.derive(move || evaluate(&a) || evaluate(&b))
    }

    /// Active for exactly one evaluation each time `self` goes false → true.
    /// The first evaluation compares against "false".
    pub fn rising(&self) -> Trigger {
        let base = self.condition.clone();
        let mut previous = false;
        self.derive(move || {
            let current = evaluate(&base);
            let edge = current && !previous;
            previous = current;
            edge
        })
    }

    /// Active for exactly one evaluation each time `self` goes true → false.
    /// The first evaluation compares against "false", so it never fires
    /// first time.
    pub fn falling(&self) -> Trigger {
        let base = self.condition.clone();
        let mut previous = false;
        self.derive(move || {
            let current = evaluate(&base);
            let edge = previous && !current;
            previous = current;
            edge
        })
    }

    /// Active once `self` has been continuously true for at least `period`.
    pub fn debounce(&self, period: Duration, clock: Rc<dyn Clock>) -> Trigger {
        let base = self.condition.clone();
        let mut high_since: Option<Duration> = None;
        self.derive(move || {
            let now = clock.now();
            if evaluate(&base) {
                let since = *high_since.get_or_insert(now);
                now.saturating_sub(since) >= period
            } else {
                high_since = None;
                false
            }
        })
    }

    // ── Bindings ──────────────────────────────────────────────────────────────

    /// Run `action` on every poll where the condition is true.
    pub fn if_high(&self, action: impl FnMut() + 'static) -> &Self {
        let condition = self.condition.clone();
        self.event_loop.bind(move || evaluate(&condition), action);
        self
    }

    /// Schedule `command` when the condition becomes true.
    pub fn on_true(&self, scheduler: &Scheduler, command: &CommandHandle) -> &Self {
        self.on_true_with(scheduler, command, true)
    }

    /// [`on_true`](Self::on_true) with an explicit interruptible flag for the
    /// admission.
    pub fn on_true_with(&self, scheduler: &Scheduler, command: &CommandHandle, interruptible: bool) -> &Self {
        self.bind_command(scheduler, command, interruptible, EdgeAction::Schedule, EdgeAction::Nothing);
        self
    }

    /// Schedule `command` when the condition becomes false.
    pub fn on_false(&self, scheduler: &Scheduler, command: &CommandHandle) -> &Self {
        self.bind_command(scheduler, command, true, EdgeAction::Nothing, EdgeAction::Schedule);
        self
    }

    /// Schedule `command` when the condition becomes true and cancel it when
    /// the condition becomes false.
    pub fn while_true(&self, scheduler: &Scheduler, command: &CommandHandle) -> &Self {
        self.bind_command(scheduler, command, true, EdgeAction::Schedule, EdgeAction::Cancel);
        self
    }

    /// Schedule `command` when the condition becomes false and cancel it when
    /// the condition becomes true.
    pub fn while_false(&self, scheduler: &Scheduler, command: &CommandHandle) -> &Self {
        self.bind_command(scheduler, command, true, EdgeAction::Cancel, EdgeAction::Schedule);
        self
    }

    /// On each rising edge, cancel `command` if it is scheduled, otherwise
    /// schedule it.
    pub fn toggle_on_true(&self, scheduler: &Scheduler, command: &CommandHandle) -> &Self {
        self.bind_command(scheduler, command, true, EdgeAction::Toggle, EdgeAction::Nothing);
        self
    }

    /// One binding per command binding.  The condition is evaluated exactly
    /// once per poll and that single sample decides which edge, if any, fired.
    fn bind_command(
        &self,
        scheduler: &Scheduler,
        command: &CommandHandle,
        interruptible: bool,
        on_rising: EdgeAction,
        on_falling: EdgeAction,
    ) {
        let condition = self.condition.clone();
        let scheduler = scheduler.clone();
        let command = command.clone();
        let mut previous = false;
        self.event_loop.bind(
            || true,
            move || {
                let current = evaluate(&condition);
                let action = match (previous, current) {
                    (false, true) => on_rising,
                    (true, false) => on_falling,
                    _ => EdgeAction::Nothing,
                };
                previous = current;
                action.apply(&scheduler, &command, interruptible);
            },
        );
    }
}

#[derive(Clone, Copy)]
enum EdgeAction {
    Nothing,
    Schedule,
    Cancel,
    Toggle,
}

impl EdgeAction {
    fn apply(self, scheduler: &Scheduler, command: &CommandHandle, interruptible: bool) {
        match self {
            EdgeAction::Nothing => {}
            EdgeAction::Schedule => schedule_logged(scheduler, command, interruptible),
            EdgeAction::Cancel => scheduler.cancel(command),
            EdgeAction::Toggle => {
                if scheduler.is_scheduled(command) {
                    scheduler.cancel(command);
                } else {
                    schedule_logged(scheduler, command, interruptible);
                }
            }
        }
    }
}

fn evaluate(condition: &Condition) -> bool {
    match condition.try_borrow_mut() {
        Ok(mut f) => (&mut *f)(),
        Err(_) => {
            warn!("trigger condition evaluated recursively, treated as false");
            false
        }
    }
}

fn schedule_logged(scheduler: &Scheduler, command: &CommandHandle, interruptible: bool) {
    if let Err(e) = scheduler.schedule_with(command, interruptible) {
        warn!(command = %command.name(), "trigger binding could not schedule command: {e}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
