/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Exclusive resources ("subsystems").
//!
//! A [`Subsystem`] is the user-facing trait: a periodic hook plus an optional
//! simulation hook.  The scheduler never holds a `Subsystem` by value; it
//! works with [`SubsystemHandle`]s, whose identity (not contents) decides
//! equality.  Commands declare requirements as [`SubsystemId`]s.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::error;

/// An exclusive resource with a periodic hook.
pub trait Subsystem {
    /// Called once per scheduler cycle, before triggers are polled.
    fn periodic(&mut self) {}

    /// Called right after [`periodic`](Self::periodic), only when the runtime
    /// mode reports simulation.
    fn simulation_periodic(&mut self) {}

    /// Label used in watchdog epochs and logs.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Strip the module path from a `type_name` string (`a::b::Drive` → `Drive`).
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ── Identity ──────────────────────────────────────────────────────────────────

/// Identity of a registered subsystem.  Two handles have the same id iff they
/// point at the same subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsystemId(usize);

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subsystem#{:x}", self.0)
    }
}

struct SubsystemCell {
    name: String,
    subsystem: RefCell<Box<dyn Subsystem>>,
}

/// Shared, identity-compared handle to a [`Subsystem`].
#[derive(Clone)]
pub struct SubsystemHandle {
    inner: Rc<SubsystemCell>,
}

impl SubsystemHandle {
    pub fn new(subsystem: impl Subsystem + 'static) -> Self {
        let name = subsystem.name().to_string();
        Self::named(name, subsystem)
    }

    /// Like [`new`](Self::new) but overrides the subsystem's own name.
    pub fn named(name: impl Into<String>, subsystem: impl Subsystem + 'static) -> Self {
        Self {
            inner: Rc::new(SubsystemCell {
                name: name.into(),
                subsystem: RefCell::new(Box::new(subsystem)),
            }),
        }
    }

    pub fn id(&self) -> SubsystemId {
        SubsystemId(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn periodic(&self) {
        self.with_subsystem("periodic", |s| s.periodic());
    }

    pub(crate) fn simulation_periodic(&self) {
        self.with_subsystem("simulation_periodic", |s| s.simulation_periodic());
    }

    fn with_subsystem(&self, hook: &str, f: impl FnOnce(&mut dyn Subsystem)) {
        match self.inner.subsystem.try_borrow_mut() {
            Ok(mut subsystem) => f(subsystem.as_mut()),
            Err(_) => error!(
                subsystem = %self.inner.name,
                hook,
                "subsystem hook re-entered while already running, skipped"
            ),
        }
    }
}

impl PartialEq for SubsystemHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SubsystemHandle {}

impl Hash for SubsystemHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for SubsystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsystemHandle")
            .field("name", &self.inner.name)
            .field("id", &self.id())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
