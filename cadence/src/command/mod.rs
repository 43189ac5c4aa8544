/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Commands: the schedulable units of work.
//!
//! ```text
//!             schedule()                        is_finished() == true
//! constructed ──────────► initialize ─► execute* ─────────────────────► end(false)
//!                                          │
//!                                          └── cancel / conflict / disabled ──► end(true)
//! ```
//!
//! User logic implements the [`Command`] trait.  The scheduler, trigger
//! bindings and compositions only ever see a [`CommandHandle`], a cheap,
//! clonable reference whose equality is identity, not value.  After either
//! `end` call the command may be scheduled again from scratch.
//!
//! A command that is a member of a composition ([`SequentialGroup`],
//! [`ParallelGroup`]) is marked *composed* and can no longer be scheduled on
//! its own.

pub mod functional;
pub mod group;

pub use functional::{instant, run, FunctionalCommand, WaitCommand};
pub use group::{ParallelGroup, SequentialGroup};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexSet;
use tracing::{debug, error};

use crate::scheduler::SchedulerError;
use crate::subsystem::{short_type_name, SubsystemHandle, SubsystemId};

/// Subsystems a command must hold exclusively while it is scheduled.
///
/// Insertion-ordered so conflicts are always resolved in declaration order.
pub type Requirements = IndexSet<SubsystemId>;

/// Build a [`Requirements`] set from subsystem handles.
pub fn requirements_of<'a>(subsystems: impl IntoIterator<Item = &'a SubsystemHandle>) -> Requirements {
    subsystems.into_iter().map(SubsystemHandle::id).collect()
}

// ── Command trait ─────────────────────────────────────────────────────────────

/// A unit of work with a begin/step/end lifecycle.
///
/// All hooks default to no-ops, so the smallest useful command only overrides
/// `execute` (and usually `is_finished`).
pub trait Command {
    /// Called once when the command is admitted.
    fn initialize(&mut self) {}

    /// Called once per cycle while the command is scheduled.
    fn execute(&mut self) {}

    /// Polled after every `execute`; returning `true` ends the command
    /// normally.
    fn is_finished(&mut self) -> bool {
        false
    }

    /// Called exactly once when the command stops.  `interrupted` is `false`
    /// only when the command finished on its own.
    fn end(&mut self, interrupted: bool) {
        let _ = interrupted;
    }

    /// Subsystems this command needs.  Read once at admission; must not change
    /// while the command is scheduled.
    fn requirements(&self) -> Requirements {
        Requirements::new()
    }

    /// Whether the command may keep running while the runtime is disabled.
    fn runs_when_disabled(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }
}

// ── Identity ──────────────────────────────────────────────────────────────────

/// Identity of a command.  Also used as the opaque numeric id published to
/// telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

impl CommandId {
    /// Numeric form published on the telemetry `Ids` entry.
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command#{:x}", self.0)
    }
}

struct CommandCell {
    name: String,
    composed: Cell<bool>,
    /// `end` requested while another hook held the command; runs as soon as
    /// that hook returns.
    pending_end: Cell<Option<bool>>,
    command: RefCell<Box<dyn Command>>,
}

/// Shared, identity-compared handle to a [`Command`].
#[derive(Clone)]
pub struct CommandHandle {
    inner: Rc<CommandCell>,
}

impl CommandHandle {
    pub fn new(command: impl Command + 'static) -> Self {
        let name = command.name().to_string();
        Self::named(name, command)
    }

    /// Like [`new`](Self::new) but overrides the command's own name.
    pub fn named(name: impl Into<String>, command: impl Command + 'static) -> Self {
        Self {
            inner: Rc::new(CommandCell {
                name: name.into(),
                composed: Cell::new(false),
                pending_end: Cell::new(None),
                command: RefCell::new(Box::new(command)),
            }),
        }
    }

    pub fn id(&self) -> CommandId {
        CommandId(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// `true` once the command has been placed in a composition.
    pub fn is_composed(&self) -> bool {
        self.inner.composed.get()
    }

    /// Claim this command for a composition.  A command can belong to at most
    /// one composition, for good.
    pub(crate) fn mark_composed(&self) -> Result<(), SchedulerError> {
        if self.inner.composed.replace(true) {
            return Err(SchedulerError::AlreadyComposed {
                command: self.name().to_string(),
            });
        }
        Ok(())
    }

    /// Returns an empty set if the command is busy in one of its own hooks.
    pub fn requirements(&self) -> Requirements {
        match self.inner.command.try_borrow() {
            Ok(command) => command.requirements(),
            Err(_) => {
                error!(command = %self.name(), "requirements queried from inside the command's own hook");
                Requirements::new()
            }
        }
    }

    pub fn runs_when_disabled(&self) -> bool {
        self.inner
            .command
            .try_borrow()
            .map(|c| c.runs_when_disabled())
            .unwrap_or(false)
    }

    // ── Lifecycle (driven by the scheduler and by compositions) ───────────────

    pub fn initialize(&self) {
        self.with_command("initialize", |c| c.initialize());
    }

    pub fn execute(&self) {
        self.with_command("execute", |c| c.execute());
    }

    /// A re-entered call reports "not finished".
    pub fn is_finished(&self) -> bool {
        self.with_command("is_finished", |c| c.is_finished())
            .unwrap_or(false)
    }

    /// Requested from inside one of the command's own hooks (a command that
    /// cancels itself from `initialize`, say), `end` runs right after that
    /// hook returns.
    pub fn end(&self, interrupted: bool) {
        let Ok(mut command) = self.inner.command.try_borrow_mut() else {
            debug!(command = %self.name(), interrupted, "end requested from inside a hook, postponed until it returns");
            self.inner.pending_end.set(Some(interrupted));
            return;
        };
        command.end(interrupted);
        drop(command);
        if self.inner.pending_end.take().is_some() {
            error!(command = %self.name(), "end re-entered from the command's own end, skipped");
        }
    }

    fn with_command<R>(&self, hook: &str, f: impl FnOnce(&mut dyn Command) -> R) -> Option<R> {
        let Ok(mut command) = self.inner.command.try_borrow_mut() else {
            error!(
                command = %self.name(),
                hook,
                "lifecycle hook re-entered while the command is already running one, skipped"
            );
            return None;
        };
        let result = f(command.as_mut());
        drop(command);

        if let Some(interrupted) = self.inner.pending_end.take() {
            self.end(interrupted);
        }
        Some(result)
    }
}

impl PartialEq for CommandHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for CommandHandle {}

impl Hash for CommandHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("name", &self.inner.name)
            .field("id", &self.id())
            .field("composed", &self.is_composed())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystem::Subsystem;

    struct Plain;
    impl Command for Plain {}

    struct Arm;
    impl Subsystem for Arm {}

    struct Needs(Requirements);
    impl Command for Needs {
        fn requirements(&self) -> Requirements {
            self.0.clone()
        }
        fn runs_when_disabled(&self) -> bool {
            true
        }
    }

    #[test]
    fn default_hooks_are_inert() {
        let handle = CommandHandle::new(Plain);
        handle.initialize();
        handle.execute();
        assert!(!handle.is_finished());
        handle.end(true);
        assert!(handle.requirements().is_empty());
        assert!(!handle.runs_when_disabled());
        assert_eq!(handle.name(), "Plain");
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = CommandHandle::new(Plain);
        let b = CommandHandle::new(Plain);
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
        assert_eq!(a, a.clone());
    }

    #[test]
    fn requirements_and_disabled_flag_are_forwarded() {
        let arm = SubsystemHandle::new(Arm);
        let handle = CommandHandle::new(Needs(requirements_of([&arm])));
        assert!(handle.requirements().contains(&arm.id()));
        assert!(handle.runs_when_disabled());
    }

    #[test]
    fn a_command_can_only_be_composed_once() {
        let handle = CommandHandle::named("member", Plain);
        assert!(!handle.is_composed());
        handle.mark_composed().unwrap();
        assert!(handle.is_composed());
        let err = handle.mark_composed().unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyComposed { ref command } if command == "member"));
    }

    /// Ends itself through its own handle from `initialize`.
    struct Quitter {
        me: Rc<RefCell<Option<CommandHandle>>>,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Command for Quitter {
        fn initialize(&mut self) {
            self.log.borrow_mut().push("init".into());
            if let Some(me) = self.me.borrow().as_ref() {
                me.end(true);
            }
            self.log.borrow_mut().push("init done".into());
        }
        fn end(&mut self, interrupted: bool) {
            self.log.borrow_mut().push(format!("end({interrupted})"));
        }
    }

    #[test]
    fn end_requested_inside_a_hook_runs_after_it_returns() {
        let me: Rc<RefCell<Option<CommandHandle>>> = Rc::default();
        let log: Rc<RefCell<Vec<String>>> = Rc::default();
        let handle = CommandHandle::new(Quitter {
            me: me.clone(),
            log: log.clone(),
        });
        *me.borrow_mut() = Some(handle.clone());

        handle.initialize();
        assert_eq!(*log.borrow(), vec!["init", "init done", "end(true)"]);

        // Nothing is left over for the next hook.
        handle.execute();
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn telemetry_id_matches_identity() {
        let a = CommandHandle::new(Plain);
        assert_eq!(a.id().as_f64(), a.clone().id().as_f64());
    }
}
