/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Command compositions.
//!
//! A composition is an ordinary [`Command`] that drives its members' hooks
//! itself.  Members are marked composed on construction, which makes the
//! scheduler refuse to schedule them independently: a member running both
//! inside its group and on its own would receive interleaved lifecycle calls.
//!
//! | Composition | Members run | Finishes when | Requirements |
//! |---|---|---|---|
//! | [`SequentialGroup`] | one at a time, in order | the last member finishes | union |
//! | [`ParallelGroup`] | all at once | every member has finished | union (must be disjoint) |

use indexmap::IndexSet;

use crate::scheduler::SchedulerError;

use super::{Command, CommandHandle, Requirements};

/// Mark every member composed and return the union of their requirements.
///
/// All members are checked before any is marked, so a refused composition
/// leaves every member schedulable.
fn compose(commands: &[CommandHandle]) -> Result<Requirements, SchedulerError> {
    let mut members = IndexSet::new();
    for command in commands {
        if command.is_composed() || !members.insert(command.id()) {
            return Err(SchedulerError::AlreadyComposed {
                command: command.name().to_string(),
            });
        }
    }

    let mut requirements = Requirements::new();
    for command in commands {
        command.mark_composed()?;
        requirements.extend(command.requirements());
    }
    Ok(requirements)
}

// ── SequentialGroup ───────────────────────────────────────────────────────────

/// Runs its members one after another.
pub struct SequentialGroup {
    name: String,
    commands: Vec<CommandHandle>,
    /// Index of the running member; `commands.len()` once done.
    current: usize,
    requirements: Requirements,
    runs_when_disabled: bool,
}

impl SequentialGroup {
    /// # Errors
    /// [`SchedulerError::AlreadyComposed`] if any member already belongs to a
    /// composition.
    pub fn new(
        name: impl Into<String>,
        commands: Vec<CommandHandle>,
    ) -> Result<Self, SchedulerError> {
        let requirements = compose(&commands)?;
        let runs_when_disabled = commands.iter().all(CommandHandle::runs_when_disabled);
        let current = commands.len();
        Ok(Self {
            name: name.into(),
            commands,
            current,
            requirements,
            runs_when_disabled,
        })
    }
}

impl Command for SequentialGroup {
    fn initialize(&mut self) {
        self.current = 0;
        if let Some(first) = self.commands.first() {
            first.initialize();
        }
    }

    fn execute(&mut self) {
        let Some(command) = self.commands.get(self.current) else {
            return;
        };
        command.execute();
        if command.is_finished() {
            command.end(false);
            self.current += 1;
            if let Some(next) = self.commands.get(self.current) {
                next.initialize();
            }
        }
    }

    fn is_finished(&mut self) -> bool {
        self.current >= self.commands.len()
    }

    fn end(&mut self, interrupted: bool) {
        if interrupted {
            if let Some(command) = self.commands.get(self.current) {
                command.end(true);
            }
        }
        self.current = self.commands.len();
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

// ── ParallelGroup ─────────────────────────────────────────────────────────────

/// Runs its members together; finishes once all of them have.
pub struct ParallelGroup {
    name: String,
    /// `(member, still running)`.
    commands: Vec<(CommandHandle, bool)>,
    requirements: Requirements,
    runs_when_disabled: bool,
}

impl ParallelGroup {
    /// # Errors
    /// * [`SchedulerError::OverlappingRequirements`] if two members require the
    ///   same subsystem.  Checked before any member is marked composed.
    /// * [`SchedulerError::AlreadyComposed`] if any member already belongs to a
    ///   composition.
    pub fn new(
        name: impl Into<String>,
        commands: Vec<CommandHandle>,
    ) -> Result<Self, SchedulerError> {
        let name = name.into();
        let mut seen = Requirements::new();
        for command in &commands {
            for requirement in command.requirements() {
                if !seen.insert(requirement) {
                    return Err(SchedulerError::OverlappingRequirements {
                        group: name,
                        command: command.name().to_string(),
                    });
                }
            }
        }

        let requirements = compose(&commands)?;
        let runs_when_disabled = commands.iter().all(CommandHandle::runs_when_disabled);
        Ok(Self {
            name,
            commands: commands.into_iter().map(|c| (c, false)).collect(),
            requirements,
            runs_when_disabled,
        })
    }
}

impl Command for ParallelGroup {
    fn initialize(&mut self) {
        for (command, running) in &mut self.commands {
            command.initialize();
            *running = true;
        }
    }

    fn execute(&mut self) {
        for (command, running) in &mut self.commands {
            if !*running {
                continue;
            }
            command.execute();
            if command.is_finished() {
                command.end(false);
                *running = false;
            }
        }
    }

    fn is_finished(&mut self) -> bool {
        self.commands.iter().all(|(_, running)| !running)
    }

    fn end(&mut self, interrupted: bool) {
        for (command, running) in &mut self.commands {
            if interrupted && *running {
                command.end(true);
            }
            *running = false;
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

// ── Tests ─────────────────────────────────────────────────────────────────────
