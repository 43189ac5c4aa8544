/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cadence – cooperative command scheduler for periodic control loops
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── scheduler/      – admission, per-cycle run loop, telemetry
//! │   ├── error.rs      Admission / RejectReason / SchedulerError
//! │   ├── state.rs      per-command bookkeeping
//! │   └── telemetry.rs  Names / Ids / Cancel table
//! ├── command/        – Command trait, handles, stock commands, groups
//! ├── subsystem.rs    – Subsystem trait and handles
//! ├── event/          – EventLoop and Trigger bindings
//! ├── watchdog.rs     – per-cycle epoch timing and overrun reports
//! ├── mode.rs         – runtime enabled/disabled/simulation state
//! ├── clock.rs        – monotonic and manual clocks
//! ├── config/         – YAML scheduler and scenario configuration
//! └── scenario.rs     – config-driven control program for the driver
//! ```

pub mod clock;
pub mod command;
pub mod config;
pub mod event;
pub mod mode;
pub mod scenario;
pub mod scheduler;
pub mod subsystem;
pub mod watchdog;
