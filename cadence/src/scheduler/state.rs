/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-command bookkeeping owned by the scheduler.

use std::time::Duration;

use crate::command::Requirements;

/// State the scheduler keeps for one scheduled command.
///
/// Created at admission, dropped the instant the command leaves the active
/// set.  Nothing outside the scheduler can reach it.
#[derive(Debug, Clone)]
pub struct CommandState {
    interruptible: bool,
    scheduled_at: Duration,
    /// Requirements read at admission; released verbatim on removal.
    requirements: Requirements,
}

impl CommandState {
    pub(crate) fn new(interruptible: bool, scheduled_at: Duration, requirements: Requirements) -> Self {
        Self {
            interruptible,
            scheduled_at,
            requirements,
        }
    }

    pub fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    pub fn scheduled_at(&self) -> Duration {
        self.scheduled_at
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    /// Time since admission, clamped at zero.
    pub fn time_since_scheduled(&self, now: Duration) -> Duration {
        now.saturating_sub(self.scheduled_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_since_scheduled_is_relative_to_admission() {
        let state = CommandState::new(true, Duration::from_millis(40), Requirements::new());
        assert!(state.is_interruptible());
        assert_eq!(
            state.time_since_scheduled(Duration::from_millis(100)),
            Duration::from_millis(60)
        );
        assert_eq!(state.time_since_scheduled(Duration::ZERO), Duration::ZERO);
    }
}
