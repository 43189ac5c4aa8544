/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cooperative command scheduler.
//!
//! [`Scheduler`] advances every scheduled [`Command`](crate::command::Command)
//! once per control cycle, arbitrates exclusive access to subsystems, and
//! resolves conflicts by interruption.
//!
//! # One cycle ([`Scheduler::run`])
//!
//! ```text
//! watchdog.reset
//!   └─► subsystem.periodic()            registration order
//!   └─► active event loop .poll()       trigger actions apply immediately
//!   └─► [in_run_loop = true]
//!         for command in admission order:
//!           disabled & !runs_when_disabled → end(true), interrupt callbacks, release
//!           execute, execute callbacks
//!           is_finished → end(false), finish callbacks, release
//!   └─► [in_run_loop = false]
//!   └─► replay deferred schedules, then deferred cancels   submission order
//!   └─► schedule default commands of unclaimed subsystems
//! watchdog.disable → overrun report (warning only) → telemetry
//! ```
//!
//! # Re-entrancy
//!
//! The scheduler is a cheap, clonable handle; commands and trigger actions
//! hold clones and call [`schedule`](Scheduler::schedule) /
//! [`cancel`](Scheduler::cancel) from inside their hooks.  While the
//! active-command pass runs, those calls are queued instead of applied, so the
//! active set is never mutated while it is being walked.  Internally no
//! borrow of the scheduler state is held across a call into user code
//! (command hooks, callbacks, subsystem hooks, trigger actions).
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | Access | Explicit handle owned by the control-loop driver, no process-wide instance |
//! | Iteration order | `IndexMap` everywhere; admission / registration order is observable |
//! | Requirements | Read once at admission and stored in [`CommandState`]; released verbatim |
//! | Soft rejects | `Ok(Admission::Rejected(_))`, logged at `debug` |
//! | Misuse | `Err(SchedulerError)` for composed commands, invalid default commands |
//!
//! # Example
//! ```rust
//! use std::rc::Rc;
//! use cadence::clock::ManualClock;
//! use cadence::command::{CommandHandle, FunctionalCommand};
//! use cadence::mode::ModeSwitch;
//! use cadence::scheduler::Scheduler;
//!
//! let scheduler = Scheduler::new(Rc::new(ModeSwitch::enabled()), Rc::new(ManualClock::new()));
//! let cmd = CommandHandle::new(FunctionalCommand::new("noop"));
//! assert!(scheduler.schedule(&cmd).unwrap().is_scheduled());
//! scheduler.run();
//! assert!(scheduler.is_scheduled(&cmd));
//! ```

pub mod error;
pub mod state;
pub mod telemetry;

pub use error::{Admission, RejectReason, SchedulerError};
pub use state::CommandState;
pub use telemetry::{MemoryTable, TelemetryTable, TelemetryValue, CANCEL_KEY, IDS_KEY, NAMES_KEY};

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::clock::Clock;
use crate::command::{CommandHandle, CommandId, Requirements};
use crate::event::EventLoop;
use crate::mode::RuntimeMode;
use crate::subsystem::{SubsystemHandle, SubsystemId};
use crate::watchdog::{CycleWatchdog, Epoch, OverrunReport, DEFAULT_PERIOD};

/// Callback invoked with the command a lifecycle event concerns.
pub type CommandAction = Rc<dyn Fn(&CommandHandle)>;

// ── Internal state types ──────────────────────────────────────────────────────

struct Scheduled {
    command: CommandHandle,
    state: CommandState,
}

struct Registration {
    subsystem: SubsystemHandle,
    default_command: Option<CommandHandle>,
}

#[derive(Clone, Copy)]
enum Hook {
    Initialize,
    Execute,
    Interrupt,
    Finish,
}

#[derive(Default)]
struct Actions {
    initialize: Vec<CommandAction>,
    execute: Vec<CommandAction>,
    interrupt: Vec<CommandAction>,
    finish: Vec<CommandAction>,
}

impl Actions {
    fn of(&self, hook: Hook) -> &[CommandAction] {
        match hook {
            Hook::Initialize => &self.initialize,
            Hook::Execute => &self.execute,
            Hook::Interrupt => &self.interrupt,
            Hook::Finish => &self.finish,
        }
    }

    fn of_mut(&mut self, hook: Hook) -> &mut Vec<CommandAction> {
        match hook {
            Hook::Initialize => &mut self.initialize,
            Hook::Execute => &mut self.execute,
            Hook::Interrupt => &mut self.interrupt,
            Hook::Finish => &mut self.finish,
        }
    }
}

struct State {
    /// Scheduled commands in admission order.  Doubles as the active set.
    scheduled: IndexMap<CommandId, Scheduled>,

    /// Claimed subsystem → claimant.  A key exists only while claimed.
    requirements: IndexMap<SubsystemId, CommandHandle>,

    /// Registered subsystems in registration order, with default commands.
    subsystems: IndexMap<SubsystemId, Registration>,

    default_loop: EventLoop,
    active_loop: EventLoop,

    disabled: bool,

    /// Set for the duration of the active-command pass.
    in_run_loop: bool,
    to_schedule: IndexMap<CommandId, (CommandHandle, bool)>,
    to_cancel: Vec<CommandHandle>,

    actions: Actions,

    watchdog: CycleWatchdog,
    last_overrun: Option<OverrunReport>,
    overruns: u64,

    telemetry: Option<Rc<RefCell<dyn TelemetryTable>>>,
}

impl State {
    /// Name of a subsystem by id, for diagnostics.  Requirements may name
    /// subsystems that were never registered.
    fn subsystem_label(&self, id: &SubsystemId) -> String {
        self.subsystems
            .get(id)
            .map(|r| r.subsystem.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }
}

struct Shared {
    state: RefCell<State>,
    mode: Rc<dyn RuntimeMode>,
    clock: Rc<dyn Clock>,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// The command scheduler.  Clones share the same scheduler.
#[derive(Clone)]
pub struct Scheduler {
    shared: Rc<Shared>,
}

impl Scheduler {
    /// Create a scheduler with the default 20 ms watchdog period.
    ///
    /// * `mode`: queried for "disabled" once per cycle and once per
    ///   admission attempt.
    /// * `clock`: timestamps admissions and feeds the watchdog.
    pub fn new(mode: Rc<dyn RuntimeMode>, clock: Rc<dyn Clock>) -> Self {
        let default_loop = EventLoop::new();
        let state = State {
            scheduled: IndexMap::new(),
            requirements: IndexMap::new(),
            subsystems: IndexMap::new(),
            active_loop: default_loop.clone(),
            default_loop,
            disabled: false,
            in_run_loop: false,
            to_schedule: IndexMap::new(),
            to_cancel: Vec::new(),
            actions: Actions::default(),
            watchdog: CycleWatchdog::new(DEFAULT_PERIOD, clock.clone()),
            last_overrun: None,
            overruns: 0,
            telemetry: None,
        };
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(state),
                mode,
                clock,
            }),
        }
    }

    fn state(&self) -> Ref<'_, State> {
        self.shared.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, State> {
        self.shared.state.borrow_mut()
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        self.shared.clock.clone()
    }

    pub fn runtime_mode(&self) -> Rc<dyn RuntimeMode> {
        self.shared.mode.clone()
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    /// Set the loop period the watchdog measures each cycle against.  Keep it
    /// in sync with the driver's actual period.
    pub fn set_period(&self, period: Duration) {
        self.state_mut().watchdog.set_timeout(period);
    }

    pub fn period(&self) -> Duration {
        self.state().watchdog.timeout()
    }

    /// Stop the scheduler: `run` and `schedule` become no-ops.  Scheduled
    /// commands stay scheduled (and stay idle) until re-enabled.
    pub fn disable(&self) {
        self.state_mut().disabled = true;
    }

    pub fn enable(&self) {
        self.state_mut().disabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        !self.state().disabled
    }

    // ── Admission ─────────────────────────────────────────────────────────────

    /// Schedule `command` as interruptible.  See [`schedule_with`](Self::schedule_with).
    pub fn schedule(&self, command: &CommandHandle) -> Result<Admission, SchedulerError> {
        self.schedule_with(command, true)
    }

    /// Schedule each command in order, as interruptible.  Stops at the first
    /// misuse error.
    pub fn schedule_all(&self, commands: &[CommandHandle]) -> Result<(), SchedulerError> {
        for command in commands {
            self.schedule(command)?;
        }
        Ok(())
    }

    /// Admit `command`, claiming its requirements.
    ///
    /// * Inside a cycle's active pass the request is queued and replayed once
    ///   the pass completes (`Ok(Admission::Deferred)`).
    /// * A disabled scheduler, a disabled runtime (unless the command runs
    ///   when disabled) or an already-scheduled command drop the request.
    /// * If any required subsystem is held by a non-interruptible command the
    ///   request is dropped and nothing is interrupted.  Otherwise every
    ///   claimant is cancelled (`end(true)` + interrupt callbacks) and the
    ///   command is admitted.
    ///
    /// `interruptible` only governs scheduler-initiated interruption by a
    /// later conflicting admission; explicit [`cancel`](Self::cancel) always
    /// succeeds.
    ///
    /// # Errors
    /// [`SchedulerError::ComposedCommand`] if `command` belongs to a
    /// composition.
    pub fn schedule_with(
        &self,
        command: &CommandHandle,
        interruptible: bool,
    ) -> Result<Admission, SchedulerError> {
        if command.is_composed() {
            return Err(SchedulerError::ComposedCommand {
                command: command.name().to_string(),
            });
        }

        {
            let mut st = self.state_mut();
            if st.in_run_loop {
                trace!(command = %command.name(), interruptible, "schedule deferred until the active pass completes");
                st.to_schedule
                    .insert(command.id(), (command.clone(), interruptible));
                return Ok(Admission::Deferred);
            }
            if st.disabled {
                return Ok(rejected(command, RejectReason::SchedulerDisabled));
            }
        }

        if self.shared.mode.is_disabled() && !command.runs_when_disabled() {
            return Ok(rejected(command, RejectReason::RuntimeDisabled));
        }
        if self.is_scheduled(command) {
            return Ok(rejected(command, RejectReason::AlreadyScheduled));
        }

        let requirements = command.requirements();

        // Current claimants, in requirement order, one entry per subsystem.
        let claimants: Vec<(SubsystemId, CommandHandle)> = {
            let st = self.state();
            requirements
                .iter()
                .filter_map(|r| st.requirements.get(r).map(|c| (*r, c.clone())))
                .collect()
        };

        if !claimants.is_empty() {
            {
                let st = self.state();
                for (subsystem, claimant) in &claimants {
                    let interruptible = st
                        .scheduled
                        .get(&claimant.id())
                        .map_or(true, |s| s.state.is_interruptible());
                    if !interruptible {
                        return Ok(rejected(
                            command,
                            RejectReason::NonInterruptibleClaimant {
                                subsystem: st.subsystem_label(subsystem),
                                claimant: claimant.name().to_string(),
                            },
                        ));
                    }
                }
            }
            for (_, claimant) in &claimants {
                // A claimant holding several of our requirements is listed
                // more than once; the second cancel is a no-op.
                self.cancel(claimant);
            }
        }

        self.init_command(command, interruptible, requirements);
        Ok(Admission::Scheduled)
    }

    fn init_command(&self, command: &CommandHandle, interruptible: bool, requirements: Requirements) {
        {
            let mut st = self.state_mut();
            for requirement in &requirements {
                st.requirements.insert(*requirement, command.clone());
            }
            let state = CommandState::new(interruptible, self.shared.clock.now(), requirements);
            st.scheduled.insert(
                command.id(),
                Scheduled {
                    command: command.clone(),
                    state,
                },
            );
        }
        debug!(command = %command.name(), interruptible, "command scheduled");

        command.initialize();
        self.fire(Hook::Initialize, command);
        self.epoch(format!("{}.initialize()", command.name()));
    }

    // ── Cancellation ──────────────────────────────────────────────────────────

    /// Cancel `command`: `end(true)` then interrupt callbacks.  Unconditional:
    /// interruptibility does not apply.  A command that is not scheduled is
    /// ignored.  Inside the active pass the request is queued.
    pub fn cancel(&self, command: &CommandHandle) {
        self.cancel_many(std::slice::from_ref(command));
    }

    /// [`cancel`](Self::cancel) each command in order.
    pub fn cancel_many(&self, commands: &[CommandHandle]) {
        {
            let mut st = self.state_mut();
            if st.in_run_loop {
                trace!(count = commands.len(), "cancel deferred until the active pass completes");
                st.to_cancel.extend(commands.iter().cloned());
                return;
            }
        }

        for command in commands {
            if !self.remove(command) {
                trace!(command = %command.name(), "cancel ignored: not scheduled");
                continue;
            }
            command.end(true);
            self.fire(Hook::Interrupt, command);
            self.epoch(format!("{}.end(true)", command.name()));
            debug!(command = %command.name(), "command interrupted");
        }
    }

    /// Cancel every scheduled command (a snapshot taken at call time).
    pub fn cancel_all(&self) {
        let all = self.scheduled_commands();
        self.cancel_many(&all);
    }

    /// Drop `command` from the active set and release what it claimed.
    /// Returns `false` if it was not scheduled.
    fn remove(&self, command: &CommandHandle) -> bool {
        let mut st = self.state_mut();
        let Some(entry) = st.scheduled.shift_remove(&command.id()) else {
            return false;
        };
        for requirement in entry.state.requirements() {
            if st.requirements.get(requirement) == Some(command) {
                st.requirements.shift_remove(requirement);
            }
        }
        true
    }

    // ── One cycle ─────────────────────────────────────────────────────────────

    /// Run one scheduler cycle.  A no-op while the scheduler is disabled.
    pub fn run(&self) {
        {
            let mut st = self.state_mut();
            if st.disabled {
                return;
            }
            st.watchdog.reset();
        }

        // 1. Subsystem periodic hooks.
        let simulation = self.shared.mode.is_simulation();
        let subsystems: Vec<SubsystemHandle> = self
            .state()
            .subsystems
            .values()
            .map(|r| r.subsystem.clone())
            .collect();
        for subsystem in &subsystems {
            subsystem.periodic();
            if simulation {
                subsystem.simulation_periodic();
            }
            self.epoch(format!("{}.periodic()", subsystem.name()));
        }

        // 2. Triggers.  Poll the loop that was active when polling started,
        //    even if an action swaps the active loop.
        let loop_cache = self.state().active_loop.clone();
        loop_cache.poll();
        self.epoch("triggers.poll()");

        // 3. Active commands.
        let active: Vec<CommandHandle> = {
            let mut st = self.state_mut();
            st.in_run_loop = true;
            st.scheduled.values().map(|s| s.command.clone()).collect()
        };
        for command in &active {
            if !self.is_scheduled(command) {
                continue;
            }

            if self.shared.mode.is_disabled() && !command.runs_when_disabled() {
                command.end(true);
                self.fire(Hook::Interrupt, command);
                self.remove(command);
                self.epoch(format!("{}.end(true)", command.name()));
                debug!(command = %command.name(), "command ended: runtime disabled");
                continue;
            }

            command.execute();
            self.fire(Hook::Execute, command);
            self.epoch(format!("{}.execute()", command.name()));

            if command.is_finished() {
                command.end(false);
                self.fire(Hook::Finish, command);
                self.remove(command);
                self.epoch(format!("{}.end(false)", command.name()));
                debug!(command = %command.name(), "command finished");
            }
        }

        // 4. Requests queued during the pass: schedules first, then cancels.
        let (to_schedule, to_cancel) = {
            let mut st = self.state_mut();
            let st = &mut *st;
            st.in_run_loop = false;
            (
                std::mem::take(&mut st.to_schedule),
                std::mem::take(&mut st.to_cancel),
            )
        };
        for (command, interruptible) in to_schedule.into_values() {
            if let Err(e) = self.schedule_with(&command, interruptible) {
                warn!(command = %command.name(), "deferred schedule failed: {e}");
            }
        }
        if !to_cancel.is_empty() {
            self.cancel_many(&to_cancel);
        }

        // 5. Default commands for subsystems nobody claims.
        let defaults: Vec<(SubsystemId, CommandHandle)> = self
            .state()
            .subsystems
            .iter()
            .filter_map(|(id, r)| r.default_command.clone().map(|c| (*id, c)))
            .collect();
        for (subsystem, default_command) in &defaults {
            if self.state().requirements.contains_key(subsystem) {
                continue;
            }
            if let Err(e) = self.schedule(default_command) {
                warn!(command = %default_command.name(), "default command could not be scheduled: {e}");
            }
        }

        // 6. Watchdog.
        let overrun = {
            let mut st = self.state_mut();
            st.watchdog.disable();
            if st.watchdog.is_expired() {
                let report = st.watchdog.report();
                st.overruns += 1;
                st.last_overrun = Some(report.clone());
                Some(report)
            } else {
                None
            }
        };
        if let Some(report) = overrun {
            warn!(
                elapsed_us = report.elapsed.as_micros() as u64,
                period_us = report.period.as_micros() as u64,
                "scheduler loop overrun: {report}"
            );
        }

        // 7. Telemetry.
        let table = self.state().telemetry.clone();
        if let Some(table) = table {
            self.update_telemetry(&mut *table.borrow_mut());
        }
    }

    // ── Subsystems ────────────────────────────────────────────────────────────

    /// Register a subsystem so its periodic hook runs and its default command
    /// is scheduled.  Registering twice keeps the existing entry.
    pub fn register_subsystem(&self, subsystem: &SubsystemHandle) {
        let mut st = self.state_mut();
        if st.subsystems.contains_key(&subsystem.id()) {
            debug!(subsystem = %subsystem.name(), "subsystem already registered");
            return;
        }
        st.subsystems.insert(
            subsystem.id(),
            Registration {
                subsystem: subsystem.clone(),
                default_command: None,
            },
        );
    }

    /// Stop calling the subsystem's hooks and scheduling its default command.
    /// A command currently holding it is left alone.
    pub fn unregister_subsystem(&self, subsystem: &SubsystemHandle) {
        self.state_mut().subsystems.shift_remove(&subsystem.id());
    }

    pub fn is_registered(&self, subsystem: &SubsystemHandle) -> bool {
        self.state().subsystems.contains_key(&subsystem.id())
    }

    /// Set the command scheduled whenever nothing else claims `subsystem`.
    /// Registers the subsystem if needed.
    ///
    /// # Errors
    /// * [`SchedulerError::ComposedCommand`]: `command` belongs to a
    ///   composition.
    /// * [`SchedulerError::DefaultCommandMissingRequirement`]: `command`
    ///   does not require `subsystem`.
    /// * [`SchedulerError::DefaultCommandFinishes`]: `command` already
    ///   reports finished.
    pub fn set_default_command(
        &self,
        subsystem: &SubsystemHandle,
        command: &CommandHandle,
    ) -> Result<(), SchedulerError> {
        if command.is_composed() {
            return Err(SchedulerError::ComposedCommand {
                command: command.name().to_string(),
            });
        }
        if !command.requirements().contains(&subsystem.id()) {
            return Err(SchedulerError::DefaultCommandMissingRequirement {
                command: command.name().to_string(),
                subsystem: subsystem.name().to_string(),
            });
        }
        if command.is_finished() {
            return Err(SchedulerError::DefaultCommandFinishes {
                command: command.name().to_string(),
                subsystem: subsystem.name().to_string(),
            });
        }

        let mut st = self.state_mut();
        st.subsystems
            .entry(subsystem.id())
            .or_insert_with(|| Registration {
                subsystem: subsystem.clone(),
                default_command: None,
            })
            .default_command = Some(command.clone());
        debug!(subsystem = %subsystem.name(), command = %command.name(), "default command set");
        Ok(())
    }

    /// Clear the subsystem's default command.  A running instance is not
    /// cancelled.
    pub fn remove_default_command(&self, subsystem: &SubsystemHandle) {
        if let Some(r) = self.state_mut().subsystems.get_mut(&subsystem.id()) {
            r.default_command = None;
        }
    }

    pub fn default_command(&self, subsystem: &SubsystemHandle) -> Option<CommandHandle> {
        self.state()
            .subsystems
            .get(&subsystem.id())
            .and_then(|r| r.default_command.clone())
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn is_scheduled(&self, command: &CommandHandle) -> bool {
        self.state().scheduled.contains_key(&command.id())
    }

    /// `true` if every command in `commands` is scheduled.
    pub fn are_scheduled(&self, commands: &[CommandHandle]) -> bool {
        let st = self.state();
        commands.iter().all(|c| st.scheduled.contains_key(&c.id()))
    }

    /// `true` if anything at all is scheduled.
    pub fn has_scheduled(&self) -> bool {
        !self.state().scheduled.is_empty()
    }

    /// Scheduled commands in admission order.
    pub fn scheduled_commands(&self) -> Vec<CommandHandle> {
        self.state()
            .scheduled
            .values()
            .map(|s| s.command.clone())
            .collect()
    }

    /// The command currently holding `subsystem`, if any.
    pub fn requiring(&self, subsystem: &SubsystemHandle) -> Option<CommandHandle> {
        self.state().requirements.get(&subsystem.id()).cloned()
    }

    /// Time since `command` was admitted; `None` if it is not scheduled.
    pub fn time_since_scheduled(&self, command: &CommandHandle) -> Option<Duration> {
        let now = self.shared.clock.now();
        self.state()
            .scheduled
            .get(&command.id())
            .map(|s| s.state.time_since_scheduled(now))
    }

    /// Whether `command` was admitted as interruptible; `None` if it is not
    /// scheduled.
    pub fn is_interruptible(&self, command: &CommandHandle) -> Option<bool> {
        self.state()
            .scheduled
            .get(&command.id())
            .map(|s| s.state.is_interruptible())
    }

    // ── Lifecycle callbacks ───────────────────────────────────────────────────

    /// Run `action` after any command initializes.
    pub fn on_command_initialize(&self, action: impl Fn(&CommandHandle) + 'static) {
        self.add_action(Hook::Initialize, Rc::new(action));
    }

    /// Run `action` after any command executes.
    pub fn on_command_execute(&self, action: impl Fn(&CommandHandle) + 'static) {
        self.add_action(Hook::Execute, Rc::new(action));
    }

    /// Run `action` after any command is interrupted.
    pub fn on_command_interrupt(&self, action: impl Fn(&CommandHandle) + 'static) {
        self.add_action(Hook::Interrupt, Rc::new(action));
    }

    /// Run `action` after any command finishes normally.
    pub fn on_command_finish(&self, action: impl Fn(&CommandHandle) + 'static) {
        self.add_action(Hook::Finish, Rc::new(action));
    }

    fn add_action(&self, hook: Hook, action: CommandAction) {
        self.state_mut().actions.of_mut(hook).push(action);
    }

    /// Invoke the callbacks for `hook` in registration order.  The list is
    /// copied first so callbacks may call back into the scheduler.
    fn fire(&self, hook: Hook, command: &CommandHandle) {
        let actions: Vec<CommandAction> = self.state().actions.of(hook).to_vec();
        for action in &actions {
            action(command);
        }
    }

    // ── Event loops ───────────────────────────────────────────────────────────

    /// The loop the scheduler polls when no other loop has been activated.
    pub fn default_event_loop(&self) -> EventLoop {
        self.state().default_loop.clone()
    }

    /// The loop polled by the next cycle.
    pub fn active_event_loop(&self) -> EventLoop {
        self.state().active_loop.clone()
    }

    /// Poll `event_loop` instead of the current one from the next cycle on.
    pub fn set_active_event_loop(&self, event_loop: &EventLoop) {
        self.state_mut().active_loop = event_loop.clone();
    }

    // ── Watchdog ──────────────────────────────────────────────────────────────

    fn epoch(&self, label: impl Into<String>) {
        self.state_mut().watchdog.add_epoch(label);
    }

    /// Epochs recorded during the most recent cycle.
    pub fn last_cycle_epochs(&self) -> Vec<Epoch> {
        self.state().watchdog.epochs().to_vec()
    }

    /// The report of the most recent overrunning cycle.
    pub fn last_overrun(&self) -> Option<OverrunReport> {
        self.state().last_overrun.clone()
    }

    pub fn overrun_count(&self) -> u64 {
        self.state().overruns
    }

    // ── Telemetry ─────────────────────────────────────────────────────────────

    /// Publish into `table` at the end of every cycle.
    pub fn attach_telemetry(&self, table: Rc<RefCell<dyn TelemetryTable>>) {
        self.state_mut().telemetry = Some(table);
    }

    /// Apply pending cancel requests from `table`, then publish the names and
    /// ids of the scheduled commands.
    pub fn update_telemetry(&self, table: &mut dyn TelemetryTable) {
        let mut ids: Vec<(f64, CommandHandle)> = self
            .scheduled_commands()
            .into_iter()
            .map(|c| (c.id().as_f64(), c))
            .collect();

        let to_cancel = table.number_array(CANCEL_KEY);
        if !to_cancel.is_empty() {
            for id in to_cancel {
                match ids.iter().position(|(v, _)| *v == id) {
                    Some(i) => {
                        let (_, command) = ids.remove(i);
                        self.cancel(&command);
                    }
                    None => warn!(id, "telemetry cancel request for unknown command id, skipped"),
                }
            }
            table.set_number_array(CANCEL_KEY, Vec::new());
        }

        let names = ids.iter().map(|(_, c)| c.name().to_string()).collect();
        table.set_string_array(NAMES_KEY, names);
        table.set_number_array(IDS_KEY, ids.into_iter().map(|(id, _)| id).collect());
    }
}

fn rejected(command: &CommandHandle, reason: RejectReason) -> Admission {
    debug!(command = %command.name(), %reason, "schedule request dropped");
    Admission::Rejected(reason)
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.state.try_borrow() {
            Ok(st) => f
                .debug_struct("Scheduler")
                .field("scheduled", &st.scheduled.len())
                .field("claimed", &st.requirements.len())
                .field("subsystems", &st.subsystems.len())
                .field("disabled", &st.disabled)
                .field("in_run_loop", &st.in_run_loop)
                .finish(),
            Err(_) => f.debug_struct("Scheduler").finish_non_exhaustive(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
