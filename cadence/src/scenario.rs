/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! A configured control program driven one cycle at a time.
//!
//! [`Scenario::build`] turns a [`ScenarioConfig`] into live objects on a
//! [`Scheduler`]:
//!
//! | Config entry | Becomes |
//! |---|---|
//! | `subsystems[i]` | a registered subsystem counting its periodic calls |
//! | `subsystems[i].default_command` | that subsystem's default command |
//! | `commands[i]` | a [`CountingCommand`] that finishes after `cycles` executes |
//! | `commands[i].schedule_at` / `cancel_at` | triggers on the default event loop |
//! | `disabled_from` / `disabled_until` | the runtime mode flag, applied per step |

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::command::{Command, CommandHandle, Requirements};
use crate::config::{CommandConfig, ScenarioConfig};
use crate::event::Trigger;
use crate::mode::{ModeSwitch, RuntimeMode};
use crate::scheduler::{MemoryTable, Scheduler};
use crate::subsystem::{Subsystem, SubsystemHandle};

// ── Counters ──────────────────────────────────────────────────────────────────

/// Lifecycle counts for one scenario command.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandStats {
    pub initialized: u64,
    pub executed: u64,
    pub finished: u64,
    pub interrupted: u64,
}

/// End-of-run summary, serializable for the driver's report.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub cycles: u64,
    pub overruns: u64,
    pub scheduled: Vec<String>,
    pub commands: IndexMap<String, CommandStats>,
    pub periodic_calls: IndexMap<String, u64>,
}

// ── Scenario building blocks ──────────────────────────────────────────────────

struct CountingSubsystem {
    name: String,
    calls: Rc<Cell<u64>>,
}

impl Subsystem for CountingSubsystem {
    fn periodic(&mut self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Command built from a [`CommandConfig`]: does nothing but count, and
/// finishes after a fixed number of executes.
pub struct CountingCommand {
    name: String,
    requirements: Requirements,
    /// `None` never finishes.
    cycles: Option<u32>,
    runs_when_disabled: bool,
    /// Executes since the last initialize.
    executed: u32,
    stats: Rc<Cell<CommandStats>>,
}

impl CountingCommand {
    fn update(&self, f: impl FnOnce(&mut CommandStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl Command for CountingCommand {
    fn initialize(&mut self) {
        self.executed = 0;
        self.update(|s| s.initialized += 1);
    }

    fn execute(&mut self) {
        self.executed += 1;
        self.update(|s| s.executed += 1);
    }

    fn is_finished(&mut self) -> bool {
        self.cycles.map_or(false, |c| self.executed >= c)
    }

    fn end(&mut self, interrupted: bool) {
        if interrupted {
            self.update(|s| s.interrupted += 1);
        } else {
            self.update(|s| s.finished += 1);
        }
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

// ── Scenario ──────────────────────────────────────────────────────────────────

pub struct Scenario {
    config: ScenarioConfig,
    scheduler: Scheduler,
    mode: Rc<ModeSwitch>,
    cycle: Rc<Cell<u64>>,
    subsystems: IndexMap<String, (SubsystemHandle, Rc<Cell<u64>>)>,
    commands: IndexMap<String, (CommandHandle, Rc<Cell<CommandStats>>)>,
    telemetry: Option<Rc<RefCell<MemoryTable>>>,
}

impl Scenario {
    /// Build `config` on `scheduler`.  `mode` must be the runtime mode the
    /// scheduler was created with; the disabled window is applied through it.
    ///
    /// # Errors
    /// Invalid cross-references in `config`, or a default command the
    /// scheduler refuses.
    pub fn build(config: &ScenarioConfig, scheduler: &Scheduler, mode: Rc<ModeSwitch>) -> Result<Self> {
        config.validate()?;

        scheduler.set_period(config.scheduler.period());
        mode.set_simulation(config.scheduler.simulation);

        let telemetry = config.scheduler.telemetry.then(|| {
            let table = Rc::new(RefCell::new(MemoryTable::new()));
            scheduler.attach_telemetry(table.clone());
            table
        });

        let mut subsystems: IndexMap<String, (SubsystemHandle, Rc<Cell<u64>>)> = IndexMap::new();
        for s in &config.subsystems {
            let calls = Rc::new(Cell::new(0));
            let handle = SubsystemHandle::new(CountingSubsystem {
                name: s.name.clone(),
                calls: calls.clone(),
            });
            scheduler.register_subsystem(&handle);
            subsystems.insert(s.name.clone(), (handle, calls));
        }

        let mut commands = IndexMap::new();
        for c in &config.commands {
            let requirements: Requirements = c
                .requires
                .iter()
                .filter_map(|r| subsystems.get(r).map(|(h, _)| h.id()))
                .collect();
            let stats = Rc::new(Cell::new(CommandStats::default()));
            let handle = CommandHandle::new(CountingCommand {
                name: c.name.clone(),
                requirements,
                cycles: c.cycles,
                runs_when_disabled: c.runs_when_disabled,
                executed: 0,
                stats: stats.clone(),
            });
            commands.insert(c.name.clone(), (handle, stats));
        }

        for s in &config.subsystems {
            let Some(name) = &s.default_command else {
                continue;
            };
            let (subsystem, _) = &subsystems[&s.name];
            let (command, _) = &commands[name];
            scheduler
                .set_default_command(subsystem, command)
                .with_context(|| format!("subsystem '{}'", s.name))?;
        }

        let cycle = Rc::new(Cell::new(0));
        let event_loop = scheduler.default_event_loop();
        for c in &config.commands {
            let (command, _) = &commands[&c.name];
            if let Some(at) = c.schedule_at {
                bind_schedule(&Trigger::new(&event_loop, at_cycle(&cycle, at)), scheduler, command, c);
            }
            if let Some(at) = c.cancel_at {
                let sched = scheduler.clone();
                let command = command.clone();
                Trigger::new(&event_loop, at_cycle(&cycle, at)).if_high(move || {
                    debug!(command = %command.name(), "scenario cancel");
                    sched.cancel(&command);
                });
            }
        }

        info!(
            subsystems = subsystems.len(),
            commands = commands.len(),
            bindings = event_loop.len(),
            "Scenario built"
        );

        Ok(Self {
            config: config.clone(),
            scheduler: scheduler.clone(),
            mode,
            cycle,
            subsystems,
            commands,
            telemetry,
        })
    }

    /// Advance to the next cycle: apply the disabled window, then run one
    /// scheduler cycle.
    pub fn step(&mut self) {
        let cycle = self.cycle.get() + 1;
        self.cycle.set(cycle);

        let disabled = self.config.is_disabled_at(cycle);
        if disabled != self.mode.is_disabled() {
            info!(cycle, disabled, "runtime mode changed");
        }
        self.mode.set_disabled(disabled);

        self.scheduler.run();
    }

    /// Cycles stepped so far.
    pub fn cycle(&self) -> u64 {
        self.cycle.get()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn command(&self, name: &str) -> Option<&CommandHandle> {
        self.commands.get(name).map(|(h, _)| h)
    }

    pub fn subsystem(&self, name: &str) -> Option<&SubsystemHandle> {
        self.subsystems.get(name).map(|(h, _)| h)
    }

    pub fn stats(&self, name: &str) -> Option<CommandStats> {
        self.commands.get(name).map(|(_, s)| s.get())
    }

    pub fn periodic_calls(&self, subsystem: &str) -> Option<u64> {
        self.subsystems.get(subsystem).map(|(_, c)| c.get())
    }

    /// Snapshot of the attached telemetry table, if enabled.
    pub fn telemetry(&self) -> Option<MemoryTable> {
        self.telemetry.as_ref().map(|t| t.borrow().clone())
    }

    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary {
            cycles: self.cycle(),
            overruns: self.scheduler.overrun_count(),
            scheduled: self
                .scheduler
                .scheduled_commands()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            commands: self
                .commands
                .iter()
                .map(|(name, (_, s))| (name.clone(), s.get()))
                .collect(),
            periodic_calls: self
                .subsystems
                .iter()
                .map(|(name, (_, c))| (name.clone(), c.get()))
                .collect(),
        }
    }
}

fn at_cycle(cycle: &Rc<Cell<u64>>, at: u64) -> impl FnMut() -> bool + 'static {
    let cycle = cycle.clone();
    move || cycle.get() == at
}

fn bind_schedule(trigger: &Trigger, scheduler: &Scheduler, command: &CommandHandle, config: &CommandConfig) {
    trigger.on_true_with(scheduler, command, config.interruptible);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
