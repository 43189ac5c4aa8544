/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Outcome and error types for the command scheduler.
//!
//! Two layers, mirroring how often each situation occurs:
//!
//! * [`RejectReason`] — a *soft* refusal.  Routine in normal control flow
//!   (a trigger firing every cycle while its command already runs), so it is
//!   reported as `Ok(Admission::Rejected(..))`, never as an error.
//! * [`SchedulerError`] — caller misuse.  A structural program error that the
//!   scheduler will not work around; the operation is refused with `Err`.
//!
//! | Situation | Result |
//! |---|---|
//! | admitted now | `Ok(Admission::Scheduled)` |
//! | requested from inside a cycle | `Ok(Admission::Deferred)` |
//! | disabled / already scheduled / blocked | `Ok(Admission::Rejected(_))` |
//! | composed command, bad default command, bad composition | `Err(SchedulerError)` |

use thiserror::Error;

// ── Admission outcome ─────────────────────────────────────────────────────────

/// What [`Scheduler::schedule`](super::Scheduler::schedule) did with a
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The command is now scheduled and has been initialized.
    Scheduled,

    /// A cycle is in progress; the request was queued and will be replayed
    /// through full admission once the active-command pass completes.
    Deferred,

    /// The request was dropped.
    Rejected(RejectReason),
}

impl Admission {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Admission::Scheduled)
    }
}

/// Why a schedule request was dropped without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The scheduler itself has been disabled with
    /// [`Scheduler::disable`](super::Scheduler::disable).
    SchedulerDisabled,

    /// The runtime mode reports disabled and the command does not run when
    /// disabled.
    RuntimeDisabled,

    /// The command is already scheduled.
    AlreadyScheduled,

    /// A required subsystem is held by a command scheduled as
    /// non-interruptible.  All-or-nothing: nothing was interrupted.
    NonInterruptibleClaimant { subsystem: String, claimant: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::SchedulerDisabled => write!(f, "scheduler is disabled"),

            RejectReason::RuntimeDisabled => write!(
                f,
                "runtime is disabled and the command does not run when disabled"
            ),

            RejectReason::AlreadyScheduled => write!(f, "command is already scheduled"),

            RejectReason::NonInterruptibleClaimant {
                subsystem,
                claimant,
            } => write!(
                f,
                "subsystem '{}' is held by non-interruptible command '{}'",
                subsystem, claimant
            ),
        }
    }
}

// ── Invalid usage ─────────────────────────────────────────────────────────────

/// Caller-misuse faults.  Each one is a structural error in the control
/// program; the offending operation has no effect.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A command that belongs to a composition was scheduled (or set as a
    /// default command) on its own.
    #[error("command '{command}' is part of a composition and cannot be scheduled independently")]
    ComposedCommand { command: String },

    /// A command was added to a second composition, or listed twice in one.
    #[error("command '{command}' already belongs to a composition")]
    AlreadyComposed { command: String },

    /// Two members of a parallel composition require the same subsystem.
    #[error("parallel group '{group}': command '{command}' shares a requirement with an earlier member")]
    OverlappingRequirements { group: String, command: String },

    /// A default command must require the subsystem it is the default for.
    #[error("default command '{command}' does not require subsystem '{subsystem}'")]
    DefaultCommandMissingRequirement { command: String, subsystem: String },

    /// A default command must not finish; it already reports finished.
    #[error("default command '{command}' for subsystem '{subsystem}' already reports finished")]
    DefaultCommandFinishes { command: String, subsystem: String },
}
