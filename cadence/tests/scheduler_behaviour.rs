/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-to-end behaviour of the scheduler through its public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence::clock::ManualClock;
use cadence::command::{CommandHandle, FunctionalCommand};
use cadence::event::Trigger;
use cadence::mode::ModeSwitch;
use cadence::scheduler::{Admission, RejectReason, Scheduler};
use cadence::subsystem::{Subsystem, SubsystemHandle};

// ── Test helpers ──────────────────────────────────────────────────────────────

type Log = Rc<RefCell<Vec<String>>>;

fn scheduler() -> Scheduler {
    Scheduler::new(Rc::new(ModeSwitch::enabled()), Rc::new(ManualClock::new()))
}

struct Mechanism(&'static str);

impl Subsystem for Mechanism {
    fn name(&self) -> &str {
        self.0
    }
}

fn mechanism(name: &'static str) -> SubsystemHandle {
    SubsystemHandle::new(Mechanism(name))
}

/// A never-finishing command that logs `<name>.init`, `<name>.exec` and
/// `<name>.end(<interrupted>)`.
fn logged(log: &Log, name: &str) -> FunctionalCommand {
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    let (n1, n2, n3) = (name.to_string(), name.to_string(), name.to_string());
    FunctionalCommand::new(name)
        .on_initialize(move || l1.borrow_mut().push(format!("{n1}.init")))
        .on_execute(move || l2.borrow_mut().push(format!("{n2}.exec")))
        .on_end(move |i| l3.borrow_mut().push(format!("{n3}.end({i})")))
}

fn count(log: &Log, entry: &str) -> usize {
    log.borrow().iter().filter(|l| *l == entry).count()
}

// ── Admission ─────────────────────────────────────────────────────────────────

#[test]
fn commands_with_disjoint_requirements_run_together() {
    let sched = scheduler();
    let log = Log::default();
    let (arm, drive) = (mechanism("arm"), mechanism("drive"));
    let a = CommandHandle::new(logged(&log, "a").requiring(&arm));
    let b = CommandHandle::new(logged(&log, "b").requiring(&drive));

    assert!(sched.schedule(&a).unwrap().is_scheduled());
    assert!(sched.schedule(&b).unwrap().is_scheduled());
    assert!(sched.are_scheduled(&[a.clone(), b.clone()]));

    sched.run();
    assert_eq!(count(&log, "a.exec"), 1);
    assert_eq!(count(&log, "b.exec"), 1);
}

#[test]
fn non_interruptible_claimant_vetoes_admission() {
    let sched = scheduler();
    let log = Log::default();
    let arm = mechanism("arm");
    let holder = CommandHandle::new(logged(&log, "holder").requiring(&arm));
    let intruder = CommandHandle::new(logged(&log, "intruder").requiring(&arm));

    sched.schedule_with(&holder, false).unwrap();
    let outcome = sched.schedule(&intruder).unwrap();

    assert!(matches!(
        outcome,
        Admission::Rejected(RejectReason::NonInterruptibleClaimant { .. })
    ));
    assert!(sched.is_scheduled(&holder));
    assert!(!sched.is_scheduled(&intruder));
    assert_eq!(sched.requiring(&arm), Some(holder));
    assert_eq!(*log.borrow(), vec!["holder.init"]);
}

#[test]
fn interruptible_claimant_is_ended_exactly_once() {
    let sched = scheduler();
    let log = Log::default();
    let arm = mechanism("arm");
    let old = CommandHandle::new(logged(&log, "old").requiring(&arm));
    let new = CommandHandle::new(logged(&log, "new").requiring(&arm));

    let interrupted = Rc::new(RefCell::new(Vec::new()));
    let seen = interrupted.clone();
    sched.on_command_interrupt(move |c| seen.borrow_mut().push(c.name().to_string()));

    sched.schedule(&old).unwrap();
    sched.schedule(&new).unwrap();

    assert_eq!(count(&log, "old.end(true)"), 1);
    assert_eq!(*interrupted.borrow(), vec!["old".to_string()]);
    assert!(!sched.is_scheduled(&old));
    assert!(sched.is_scheduled(&new));
    assert_eq!(sched.requiring(&arm), Some(new));
}

#[test]
fn scheduling_twice_is_idempotent() {
    let sched = scheduler();
    let log = Log::default();
    let cmd = CommandHandle::new(logged(&log, "c"));

    assert_eq!(sched.schedule(&cmd).unwrap(), Admission::Scheduled);
    assert_eq!(
        sched.schedule(&cmd).unwrap(),
        Admission::Rejected(RejectReason::AlreadyScheduled)
    );
    assert_eq!(count(&log, "c.init"), 1);
    assert_eq!(sched.scheduled_commands().len(), 1);
}

// ── Re-entrancy ───────────────────────────────────────────────────────────────

#[test]
fn schedule_from_execute_waits_for_the_pass_to_complete() {
    let sched = scheduler();
    let log = Log::default();
    let target = CommandHandle::new(logged(&log, "target"));

    let observed = Rc::new(Cell::new(None));
    let (s, t, o) = (sched.clone(), target.clone(), observed.clone());
    let spawner = CommandHandle::new(FunctionalCommand::new("spawner").on_execute(move || {
        let admission = s.schedule(&t).unwrap();
        o.set(Some((admission == Admission::Deferred, s.is_scheduled(&t))));
    }));

    sched.schedule(&spawner).unwrap();
    sched.run();

    assert_eq!(observed.get(), Some((true, false)));
    assert!(sched.is_scheduled(&target));
    // Admitted after the pass: initialized but not yet executed.
    assert_eq!(*log.borrow(), vec!["target.init"]);

    sched.run();
    assert_eq!(count(&log, "target.exec"), 1);
}

#[test]
fn a_command_may_reschedule_itself_from_execute() {
    let sched = scheduler();
    let log = Log::default();
    let slot: Rc<RefCell<Option<CommandHandle>>> = Rc::default();
    let (s, me, l) = (sched.clone(), slot.clone(), log.clone());
    let runs = Rc::new(Cell::new(0));
    let r = runs.clone();
    let cmd = CommandHandle::new(
        FunctionalCommand::new("again")
            .on_initialize(move || l.borrow_mut().push("again.init".into()))
            .on_execute(move || {
                r.set(r.get() + 1);
                if let Some(me) = me.borrow().as_ref() {
                    s.schedule(me).unwrap();
                }
            })
            .until(|| true),
    );
    *slot.borrow_mut() = Some(cmd.clone());

    sched.schedule(&cmd).unwrap();
    sched.run();

    // Finished during the pass, then re-admitted from the queue.
    assert!(sched.is_scheduled(&cmd));
    assert_eq!(count(&log, "again.init"), 2);
    assert_eq!(runs.get(), 1);
}

#[test]
fn deferred_schedule_then_cancel_in_one_pass_leaves_command_cancelled() {
    let sched = scheduler();
    let log = Log::default();
    let target = CommandHandle::new(logged(&log, "target"));

    let (s1, t1) = (sched.clone(), target.clone());
    let scheduler_cmd =
        CommandHandle::new(FunctionalCommand::new("scheduler").on_execute(move || {
            s1.schedule(&t1).unwrap();
        }));
    let (s2, t2) = (sched.clone(), target.clone());
    let canceller = CommandHandle::new(FunctionalCommand::new("canceller").on_execute(move || {
        s2.cancel(&t2);
    }));

    sched.schedule(&scheduler_cmd).unwrap();
    sched.schedule(&canceller).unwrap();
    sched.run();

    // Schedules are replayed first, then cancels.
    assert_eq!(*log.borrow(), vec!["target.init", "target.end(true)"]);
    assert!(!sched.is_scheduled(&target));
}

#[test]
fn deferred_cancel_then_schedule_in_one_pass_still_cancels_last() {
    let sched = scheduler();
    let log = Log::default();
    let target = CommandHandle::new(logged(&log, "target"));

    // Submitted in the opposite order; the replay order is unchanged.
    let (s1, t1) = (sched.clone(), target.clone());
    let canceller = CommandHandle::new(FunctionalCommand::new("canceller").on_execute(move || {
        s1.cancel(&t1);
    }));
    let (s2, t2) = (sched.clone(), target.clone());
    let scheduler_cmd =
        CommandHandle::new(FunctionalCommand::new("scheduler").on_execute(move || {
            s2.schedule(&t2).unwrap();
        }));

    sched.schedule(&canceller).unwrap();
    sched.schedule(&scheduler_cmd).unwrap();
    sched.run();

    assert_eq!(*log.borrow(), vec!["target.init", "target.end(true)"]);
    assert!(!sched.is_scheduled(&target));
}

#[test]
fn interrupt_callback_may_schedule_a_replacement() {
    let sched = scheduler();
    let log = Log::default();
    let arm = mechanism("arm");
    let first = CommandHandle::new(logged(&log, "first").requiring(&arm));
    let fallback = CommandHandle::new(logged(&log, "fallback"));

    let (s, fb, f) = (sched.clone(), fallback.clone(), first.clone());
    sched.on_command_interrupt(move |c| {
        if *c == f {
            s.schedule(&fb).unwrap();
        }
    });

    sched.schedule(&first).unwrap();
    sched.cancel(&first);

    assert!(sched.is_scheduled(&fallback));
    assert_eq!(
        *log.borrow(),
        vec!["first.init", "first.end(true)", "fallback.init"]
    );
}

#[test]
fn a_command_cancelling_itself_from_initialize_is_ended_once() {
    let sched = scheduler();
    let log = Log::default();
    let slot: Rc<RefCell<Option<CommandHandle>>> = Rc::default();
    let (s, me, l) = (sched.clone(), slot.clone(), log.clone());
    let cmd = CommandHandle::new(
        logged(&log, "quitter").on_initialize(move || {
            l.borrow_mut().push("quitter.init".into());
            if let Some(me) = me.borrow().as_ref() {
                s.cancel(me);
            }
        }),
    );
    *slot.borrow_mut() = Some(cmd.clone());

    let interrupts = Rc::new(Cell::new(0));
    let i = interrupts.clone();
    sched.on_command_interrupt(move |_| i.set(i.get() + 1));

    sched.schedule(&cmd).unwrap();

    assert!(!sched.is_scheduled(&cmd));
    assert_eq!(count(&log, "quitter.end(true)"), 1);
    assert_eq!(interrupts.get(), 1);
    assert_eq!(*log.borrow(), vec!["quitter.init", "quitter.end(true)"]);
}

#[test]
fn an_initialize_callback_may_cancel_the_new_command() {
    let sched = scheduler();
    let log = Log::default();
    let cmd = CommandHandle::new(logged(&log, "brief"));

    let s = sched.clone();
    sched.on_command_initialize(move |c| s.cancel(c));
    let interrupts = Rc::new(Cell::new(0));
    let i = interrupts.clone();
    sched.on_command_interrupt(move |_| i.set(i.get() + 1));

    sched.schedule(&cmd).unwrap();

    assert!(!sched.is_scheduled(&cmd));
    assert_eq!(count(&log, "brief.end(true)"), interrupts.get());
    assert_eq!(interrupts.get(), 1);
}

// ── Cancellation ──────────────────────────────────────────────────────────────

#[test]
fn cancel_all_empties_the_scheduler() {
    let sched = scheduler();
    let log = Log::default();
    let arm = mechanism("arm");
    let commands: Vec<CommandHandle> = (0..5)
        .map(|i| CommandHandle::new(logged(&log, &format!("c{i}"))))
        .collect();
    let hold = CommandHandle::new(logged(&log, "hold").requiring(&arm));

    sched.schedule_all(&commands).unwrap();
    sched.schedule_with(&hold, false).unwrap();
    sched.cancel_all();

    assert!(!sched.has_scheduled());
    assert_eq!(sched.requiring(&arm), None);
    assert_eq!(count(&log, "hold.end(true)"), 1);
}

#[test]
fn cancel_of_an_idle_command_is_a_no_op() {
    let sched = scheduler();
    let log = Log::default();
    let cmd = CommandHandle::new(logged(&log, "idle"));
    let interrupts = Rc::new(Cell::new(0));
    let i = interrupts.clone();
    sched.on_command_interrupt(move |_| i.set(i.get() + 1));

    sched.cancel(&cmd);

    assert!(log.borrow().is_empty());
    assert_eq!(interrupts.get(), 0);
}

// ── Default commands ──────────────────────────────────────────────────────────

#[test]
fn default_command_returns_whenever_the_subsystem_is_free() {
    let sched = scheduler();
    let log = Log::default();
    let arm = mechanism("arm");
    let idle = CommandHandle::new(logged(&log, "idle").requiring(&arm));
    let raise = CommandHandle::new(logged(&log, "raise").requiring(&arm).until({
        let mut n = 0;
        move || {
            n += 1;
            n >= 2
        }
    }));
    sched.set_default_command(&arm, &idle).unwrap();

    sched.run();
    assert!(sched.is_scheduled(&idle));
    sched.run();
    assert!(sched.is_scheduled(&idle));

    sched.schedule(&raise).unwrap();
    assert_eq!(count(&log, "idle.end(true)"), 1);
    assert_eq!(sched.requiring(&arm), Some(raise.clone()));

    sched.run(); // raise executes once
    assert!(!sched.is_scheduled(&idle));
    sched.run(); // raise finishes; default restored in the same cycle
    assert!(!sched.is_scheduled(&raise));
    assert!(sched.is_scheduled(&idle));
    assert_eq!(count(&log, "idle.init"), 2);
}

// ── Enable / disable ──────────────────────────────────────────────────────────

#[test]
fn disabling_the_scheduler_mid_cycle_freezes_later_cycles() {
    let sched = scheduler();
    let log = Log::default();
    let arm = mechanism("arm");
    let worker = CommandHandle::new(logged(&log, "worker").requiring(&arm));

    let s = sched.clone();
    let stopper = CommandHandle::new(FunctionalCommand::new("stopper").on_execute(move || s.disable()));

    sched.schedule(&stopper).unwrap();
    sched.schedule(&worker).unwrap();
    sched.run();
    assert_eq!(count(&log, "worker.exec"), 1, "the current cycle completes");

    for _ in 0..3 {
        sched.run();
    }
    assert_eq!(count(&log, "worker.exec"), 1);
    assert!(sched.are_scheduled(&[stopper.clone(), worker.clone()]));
    assert_eq!(sched.requiring(&arm), Some(worker.clone()));
    assert_eq!(count(&log, "worker.end(true)"), 0);

    sched.enable();
    sched.run();
    assert_eq!(count(&log, "worker.exec"), 2);
}

// ── End to end ────────────────────────────────────────────────────────────────

#[test]
fn interruptibility_is_a_property_of_the_claimant() {
    let sched = scheduler();
    let log = Log::default();
    let s = mechanism("s");
    let a = CommandHandle::new(logged(&log, "a").requiring(&s));
    let b = CommandHandle::new(logged(&log, "b").requiring(&s));
    sched.register_subsystem(&s);

    // A is interruptible, so B (non-interruptible) displaces it.
    sched.schedule_with(&a, true).unwrap();
    assert_eq!(sched.requiring(&s), Some(a.clone()));
    assert_eq!(sched.schedule_with(&b, false).unwrap(), Admission::Scheduled);
    assert_eq!(count(&log, "a.end(true)"), 1);
    assert_eq!(sched.requiring(&s), Some(b.clone()));

    // B now holds S and is non-interruptible: A bounces.
    let outcome = sched.schedule_with(&a, true).unwrap();
    assert_eq!(
        outcome,
        Admission::Rejected(RejectReason::NonInterruptibleClaimant {
            subsystem: "s".into(),
            claimant: "b".into(),
        })
    );
    assert!(sched.is_scheduled(&b));
    assert!(!sched.is_scheduled(&a));
}

#[test]
fn trigger_bindings_drive_commands_across_cycles() {
    let sched = scheduler();
    let log = Log::default();
    let button = Rc::new(Cell::new(false));
    let b = button.clone();
    let cmd = CommandHandle::new(logged(&log, "held"));
    Trigger::new(&sched.default_event_loop(), move || b.get()).while_true(&sched, &cmd);

    sched.run();
    assert!(!sched.is_scheduled(&cmd));

    button.set(true);
    sched.run();
    sched.run();
    assert!(sched.is_scheduled(&cmd));
    assert_eq!(count(&log, "held.exec"), 2);

    button.set(false);
    sched.run();
    assert!(!sched.is_scheduled(&cmd));
    assert_eq!(count(&log, "held.end(true)"), 1);
}
