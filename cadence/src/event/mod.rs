/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Single-threaded poll-and-dispatch.
//!
//! An [`EventLoop`] is an ordered list of `(condition, action)` bindings.
//! [`poll`](EventLoop::poll) evaluates every condition once, in binding
//! order, and runs the bound action in-line whenever its condition is true.
//! The loop itself keeps no history; edge detection lives in the condition
//! (see [`Trigger::rising`]).
//!
//! `EventLoop` is a shared handle: clones refer to the same binding list, so a
//! [`Trigger`] can bind into the loop the scheduler polls.
//!
//! # Re-entrancy
//! Actions may bind new actions or clear the loop while it is being polled:
//!
//! * bindings added during a poll run from the next poll on;
//! * `clear` during a poll drops every binding that existed before the poll
//!   once the poll completes (the current pass still finishes).

pub mod trigger;

pub use trigger::Trigger;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

struct Binding {
    condition: Box<dyn FnMut() -> bool>,
    action: Box<dyn FnMut()>,
}

#[derive(Default)]
struct LoopInner {
    bindings: RefCell<Vec<Binding>>,
    /// Set by `clear`; consulted when a poll puts its bindings back.
    cleared: Cell<bool>,
}

/// Shared handle to an ordered list of condition/action bindings.
#[derive(Clone, Default)]
pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding.  `action` runs on every poll where `condition`
    /// returns `true`.
    pub fn bind(&self, condition: impl FnMut() -> bool + 'static, action: impl FnMut() + 'static) {
        self.inner.bindings.borrow_mut().push(Binding {
            condition: Box::new(condition),
            action: Box::new(action),
        });
    }

    /// Evaluate every binding once, in registration order.
    pub fn poll(&self) {
        self.inner.cleared.set(false);
        let mut running = std::mem::take(&mut *self.inner.bindings.borrow_mut());

        for binding in running.iter_mut() {
            if (binding.condition)() {
                (binding.action)();
            }
        }

        let mut slot = self.inner.bindings.borrow_mut();
        let added = std::mem::take(&mut *slot);
        if !self.inner.cleared.replace(false) {
            *slot = running;
        }
        slot.extend(added);
    }

    /// Remove every binding.
    pub fn clear(&self) {
        self.inner.bindings.borrow_mut().clear();
        self.inner.cleared.set(true);
    }

    pub fn len(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if both handles refer to the same loop.
    pub fn ptr_eq(&self, other: &EventLoop) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `try_borrow` because Debug may run from inside a polled action.
        let bindings = self.inner.bindings.try_borrow().map(|b| b.len()).ok();
        f.debug_struct("EventLoop").field("bindings", &bindings).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
