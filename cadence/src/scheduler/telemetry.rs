/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Key/value telemetry boundary.
//!
//! Once per cycle the scheduler publishes the names and opaque numeric ids of
//! its scheduled commands, and accepts a list of ids to cancel:
//!
//! | Key | Direction | Value |
//! |---|---|---|
//! | [`NAMES_KEY`] | out | command names, admission order |
//! | [`IDS_KEY`] | out | matching [`CommandId`](crate::command::CommandId)s as numbers |
//! | [`CANCEL_KEY`] | in | ids to cancel; cleared once applied |
//!
//! The transport behind [`TelemetryTable`] is not our concern; [`MemoryTable`]
//! is the in-process implementation used by the driver and the tests.

use std::collections::BTreeMap;

use serde::Serialize;

pub const NAMES_KEY: &str = "Names";
pub const IDS_KEY: &str = "Ids";
pub const CANCEL_KEY: &str = "Cancel";

/// A generic key/value sink the scheduler publishes into.
pub trait TelemetryTable {
    fn set_string_array(&mut self, key: &str, values: Vec<String>);

    fn set_number_array(&mut self, key: &str, values: Vec<f64>);

    /// The number array stored under `key`; empty if absent or of another
    /// type.
    fn number_array(&self, key: &str) -> Vec<f64>;
}

/// A value stored in a [`MemoryTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Strings(Vec<String>),
    Numbers(Vec<f64>),
}

/// In-memory [`TelemetryTable`], sorted by key.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct MemoryTable {
    entries: BTreeMap<String, TelemetryValue>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&TelemetryValue> {
        self.entries.get(key)
    }

    pub fn string_array(&self, key: &str) -> Vec<String> {
        match self.entries.get(key) {
            Some(TelemetryValue::Strings(v)) => v.clone(),
            _ => Vec::new(),
        }
    }
}

impl TelemetryTable for MemoryTable {
    fn set_string_array(&mut self, key: &str, values: Vec<String>) {
        self.entries
            .insert(key.to_string(), TelemetryValue::Strings(values));
    }

    fn set_number_array(&mut self, key: &str, values: Vec<f64>) {
        self.entries
            .insert(key.to_string(), TelemetryValue::Numbers(values));
    }

    fn number_array(&self, key: &str) -> Vec<f64> {
        match self.entries.get(key) {
            Some(TelemetryValue::Numbers(v)) => v.clone(),
            _ => Vec::new(),
        }
    }
}
