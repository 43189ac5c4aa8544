/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler and scenario configuration.
//!
//! A scenario file describes a small control program: the subsystems to
//! register, the commands to build, and the cycles at which triggers schedule
//! or cancel them.
//!
//! ```yaml
//! scheduler:
//!   period_ms: 20        # watchdog budget per cycle
//!   simulation: false    # also run subsystem simulation hooks
//!   telemetry: true      # publish Names/Ids into an in-memory table
//! subsystems:
//!   - name: drive
//!     default_command: idle
//!   - name: arm
//! commands:
//!   - name: idle
//!     requires: [drive]
//!   - name: raise
//!     requires: [arm]
//!     cycles: 5           # finishes after 5 executes; omit or null for never
//!     schedule_at: 3
//!   - name: hold
//!     requires: [arm]
//!     interruptible: false
//!     schedule_at: 10
//!     cancel_at: 40
//! disabled_from: 50       # runtime reports disabled for cycles [50, 60)
//! disabled_until: 60
//! ```
//!
//! Cycles are counted from 1: the first [`Scenario::step`](crate::scenario::Scenario::step)
//! is cycle 1.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::watchdog::DEFAULT_PERIOD;

// ── Scheduler settings ────────────────────────────────────────────────────────

/// Settings applied to a [`Scheduler`](crate::scheduler::Scheduler) and its
/// driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Loop period in milliseconds; also the watchdog budget.
    pub period_ms: u64,
    /// Run subsystem simulation hooks after their periodic hooks.
    pub simulation: bool,
    /// Attach an in-memory telemetry table.
    pub telemetry: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD.as_millis() as u64,
            simulation: false,
            telemetry: true,
        }
    }
}

impl SchedulerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// # Errors
    /// A zero period.
    pub fn validate(&self) -> Result<()> {
        if self.period_ms == 0 {
            bail!("scheduler.period_ms must be greater than zero");
        }
        Ok(())
    }
}

// ── Scenario entries ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemConfig {
    pub name: String,
    /// Name of a command in the `commands` list.
    #[serde(default)]
    pub default_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub name: String,

    /// Subsystem names, in order.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Executes before finishing.  `None` means the command never finishes
    /// on its own.
    #[serde(default)]
    pub cycles: Option<u32>,

    #[serde(default = "default_true")]
    pub interruptible: bool,

    #[serde(default)]
    pub runs_when_disabled: bool,

    /// Cycle at which a trigger schedules the command.
    #[serde(default)]
    pub schedule_at: Option<u64>,

    /// Cycle at which a trigger cancels the command.
    #[serde(default)]
    pub cancel_at: Option<u64>,
}

fn default_true() -> bool {
    true
}

// ── ScenarioConfig ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub subsystems: Vec<SubsystemConfig>,

    #[serde(default)]
    pub commands: Vec<CommandConfig>,

    /// First cycle on which the runtime reports disabled.
    #[serde(default)]
    pub disabled_from: Option<u64>,

    /// First cycle on which the runtime is enabled again.  Absent means the
    /// runtime stays disabled.
    #[serde(default)]
    pub disabled_until: Option<u64>,
}

impl ScenarioConfig {
    /// Parse and validate the scenario file at `path`.
    ///
    /// # Errors
    /// The file cannot be read, is not valid YAML, or fails
    /// [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading scenario from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open scenario file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid scenario file: {}", path.display()))
    }

    /// Parse and validate a scenario from YAML text.  Empty text yields the
    /// empty scenario.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            warn!("Scenario is empty, using defaults");
            return Ok(Self::default());
        }

        let config: ScenarioConfig =
            serde_yaml::from_str(text).context("Failed to parse scenario YAML")?;
        config.validate()?;

        info!(
            subsystems = config.subsystems.len(),
            commands = config.commands.len(),
            period_ms = config.scheduler.period_ms,
            "Scenario loaded"
        );
        for c in &config.commands {
            debug!(
                "  Command: {} | requires: {:?} | cycles: {:?} | interruptible: {} | at: {:?}/{:?}",
                c.name, c.requires, c.cycles, c.interruptible, c.schedule_at, c.cancel_at,
            );
        }

        Ok(config)
    }

    /// Check cross-references.
    ///
    /// # Errors
    /// * a zero period,
    /// * duplicate subsystem or command names,
    /// * a command requiring an unknown subsystem,
    /// * a default command naming an unknown command,
    /// * a disabled window that ends before it starts.
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;

        let mut subsystems = HashSet::new();
        for s in &self.subsystems {
            if !subsystems.insert(s.name.as_str()) {
                bail!("duplicate subsystem '{}'", s.name);
            }
        }

        let mut commands = HashSet::new();
        for c in &self.commands {
            if !commands.insert(c.name.as_str()) {
                bail!("duplicate command '{}'", c.name);
            }
            if let Some(unknown) = c.requires.iter().find(|r| !subsystems.contains(r.as_str())) {
                bail!("command '{}' requires unknown subsystem '{}'", c.name, unknown);
            }
        }

        for s in &self.subsystems {
            if let Some(default) = &s.default_command {
                if !commands.contains(default.as_str()) {
                    bail!(
                        "subsystem '{}' names unknown default command '{}'",
                        s.name,
                        default
                    );
                }
            }
        }

        if let (Some(from), Some(until)) = (self.disabled_from, self.disabled_until) {
            if until < from {
                bail!("disabled_until ({until}) is before disabled_from ({from})");
            }
        }

        Ok(())
    }

    /// Whether the runtime reports disabled on `cycle`.
    pub fn is_disabled_at(&self, cycle: u64) -> bool {
        match (self.disabled_from, self.disabled_until) {
            (Some(from), Some(until)) => (from..until).contains(&cycle),
            (Some(from), None) => cycle >= from,
            _ => false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const EXAMPLE: &str = r#"
scheduler:
  period_ms: 10
  simulation: true
subsystems:
  - name: drive
    default_command: idle
  - name: arm
commands:
  - name: idle
    requires: [drive]
  - name: raise
    requires: [arm]
    cycles: 5
    schedule_at: 3
  - name: hold
    requires: [arm]
    interruptible: false
    runs_when_disabled: true
    schedule_at: 10
    cancel_at: 40
disabled_from: 50
disabled_until: 60
"#;

    // ── SchedulerConfig ───────────────────────────────────────────────────────

    #[test]
    fn scheduler_defaults() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.period(), Duration::from_millis(20));
        assert!(!cfg.simulation);
        assert!(cfg.telemetry);
    }

    #[test]
    fn zero_period_is_rejected() {
        let cfg = SchedulerConfig {
            period_ms: 0,
            ..SchedulerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    // ── ScenarioConfig: load_from_file ────────────────────────────────────────

    #[test]
    fn load_example_yaml() {
        let f = yaml_tempfile(EXAMPLE);
        let cfg = ScenarioConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.scheduler.period_ms, 10);
        assert!(cfg.scheduler.simulation);
        assert!(cfg.scheduler.telemetry, "omitted field keeps its default");

        let names: Vec<_> = cfg.subsystems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["drive", "arm"]);
        assert_eq!(cfg.subsystems[0].default_command.as_deref(), Some("idle"));

        let idle = &cfg.commands[0];
        assert_eq!(idle.cycles, None);
        assert!(idle.interruptible);
        assert!(!idle.runs_when_disabled);
        assert_eq!(idle.schedule_at, None);

        let hold = &cfg.commands[2];
        assert!(!hold.interruptible);
        assert!(hold.runs_when_disabled);
        assert_eq!(hold.schedule_at, Some(10));
        assert_eq!(hold.cancel_at, Some(40));
    }

    #[test]
    fn missing_file_returns_error() {
        let result = ScenarioConfig::load_from_file(Path::new("/nonexistent/path/scenario.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(ScenarioConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn empty_scenario_is_accepted() {
        let cfg = ScenarioConfig::from_yaml_str("").unwrap();
        assert_eq!(cfg, ScenarioConfig::default());

        let cfg = ScenarioConfig::from_yaml_str("subsystems: []\n").unwrap();
        assert!(cfg.commands.is_empty());
    }

    // ── ScenarioConfig: validate ──────────────────────────────────────────────

    #[test]
    fn unknown_required_subsystem_is_an_error() {
        let yaml = "subsystems: [{name: arm}]\ncommands: [{name: c, requires: [leg]}]\n";
        let err = ScenarioConfig::from_yaml_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("unknown subsystem 'leg'"));
    }

    #[test]
    fn unknown_default_command_is_an_error() {
        let yaml = "subsystems: [{name: arm, default_command: nope}]\n";
        let err = ScenarioConfig::from_yaml_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("unknown default command 'nope'"));
    }

    #[test]
    fn duplicate_names_are_errors() {
        assert!(ScenarioConfig::from_yaml_str("subsystems: [{name: a}, {name: a}]\n").is_err());
        assert!(ScenarioConfig::from_yaml_str("commands: [{name: c}, {name: c}]\n").is_err());
    }

    #[test]
    fn inverted_disabled_window_is_an_error() {
        assert!(ScenarioConfig::from_yaml_str("disabled_from: 10\ndisabled_until: 5\n").is_err());
    }

    // ── ScenarioConfig: disabled window ───────────────────────────────────────

    #[test]
    fn disabled_window_is_half_open() {
        let cfg = ScenarioConfig::from_yaml_str(EXAMPLE).unwrap();
        assert!(!cfg.is_disabled_at(49));
        assert!(cfg.is_disabled_at(50));
        assert!(cfg.is_disabled_at(59));
        assert!(!cfg.is_disabled_at(60));
    }

    #[test]
    fn open_ended_window_stays_disabled() {
        let cfg = ScenarioConfig {
            disabled_from: Some(3),
            ..ScenarioConfig::default()
        };
        assert!(!cfg.is_disabled_at(2));
        assert!(cfg.is_disabled_at(1_000));
        assert!(!ScenarioConfig::default().is_disabled_at(1));
    }
}
