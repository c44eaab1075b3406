// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Progress context carried between handler invocations.
//!
//! The host persists the context verbatim between invocations, so it
//! serializes to one flat JSON object of primitive values. Keys are
//! namespaced by what they hold:
//!
//! | Prefix     | Value   | Meaning                                   |
//! |------------|---------|-------------------------------------------|
//! | `marker:`  | bool    | a guarded step (or issued call) completed |
//! | `ts:`      | integer | checkpoint timestamp, epoch milliseconds  |
//! | `scratch:` | string  | value memoized by one step for a later one|
//! | `attempt:` | integer | retry/stabilization attempt counter       |

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MARKER_PREFIX: &str = "marker:";
const TIMESTAMP_PREFIX: &str = "ts:";
const SCRATCH_PREFIX: &str = "scratch:";
const ATTEMPT_PREFIX: &str = "attempt:";

/// Resumable state of one logical operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, Value>"
)]
pub struct CallbackContext {
    markers: BTreeMap<String, bool>,
    timestamps: BTreeMap<String, i64>,
    scratch: BTreeMap<String, String>,
    attempts: BTreeMap<String, u32>,
}

impl CallbackContext {
    /// Create an empty context for a new operation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the marker for `key` has been set.
    pub fn is_done(&self, key: &str) -> bool {
        self.markers.get(key).copied().unwrap_or(false)
    }

    /// Set the marker for `key`. Markers are never cleared.
    pub fn mark_done(&mut self, key: &str) {
        self.markers.insert(key.to_string(), true);
    }

    /// Record `at` under `key` unless a timestamp is already stored there.
    pub fn timestamp_once(&mut self, key: &str, at: DateTime<Utc>) {
        self.timestamps
            .entry(key.to_string())
            .or_insert_with(|| at.timestamp_millis());
    }

    /// Timestamp stored under `key`.
    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.timestamps
            .get(key)
            .and_then(|ms| Utc.timestamp_millis_opt(*ms).single())
    }

    /// Scratch value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.scratch.get(key).map(String::as_str)
    }

    /// Store a scratch value, replacing any previous one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.scratch.insert(key.to_string(), value.into());
    }

    /// Store a scratch value only if `key` holds nothing yet.
    pub fn set_once(&mut self, key: &str, value: impl Into<String>) {
        self.scratch
            .entry(key.to_string())
            .or_insert_with(|| value.into());
    }

    /// Current attempt count for `key` (0 if never attempted).
    pub fn attempts(&self, key: &str) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }

    /// Increment and return the attempt count for `key`.
    pub fn increment_attempts(&mut self, key: &str) -> u32 {
        let counter = self.attempts.entry(key.to_string()).or_insert(0);
        *counter = counter.saturating_add(1);
        *counter
    }

    /// Forget the attempt count for `key`.
    pub fn reset_attempts(&mut self, key: &str) {
        self.attempts.remove(key);
    }

    /// Serialize to the flat JSON form the host persists.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a context previously produced by [`CallbackContext::to_json`].
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Error for a persisted context that does not follow the flat layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidContextEntry(String);

impl fmt::Display for InvalidContextEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid callback context entry '{}'", self.0)
    }
}

impl From<CallbackContext> for BTreeMap<String, Value> {
    fn from(context: CallbackContext) -> Self {
        let mut flat = BTreeMap::new();
        for (key, done) in context.markers {
            flat.insert(format!("{MARKER_PREFIX}{key}"), Value::Bool(done));
        }
        for (key, ms) in context.timestamps {
            flat.insert(format!("{TIMESTAMP_PREFIX}{key}"), Value::from(ms));
        }
        for (key, value) in context.scratch {
            flat.insert(format!("{SCRATCH_PREFIX}{key}"), Value::String(value));
        }
        for (key, count) in context.attempts {
            flat.insert(format!("{ATTEMPT_PREFIX}{key}"), Value::from(count));
        }
        flat
    }
}

impl TryFrom<BTreeMap<String, Value>> for CallbackContext {
    type Error = InvalidContextEntry;

    fn try_from(flat: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        let mut context = CallbackContext::default();
        for (key, value) in flat {
            let parsed = if let Some(name) = key.strip_prefix(MARKER_PREFIX) {
                value
                    .as_bool()
                    .map(|done| context.markers.insert(name.to_string(), done))
                    .is_some()
            } else if let Some(name) = key.strip_prefix(TIMESTAMP_PREFIX) {
                value
                    .as_i64()
                    .map(|ms| context.timestamps.insert(name.to_string(), ms))
                    .is_some()
            } else if let Some(name) = key.strip_prefix(SCRATCH_PREFIX) {
                value
                    .as_str()
                    .map(|s| context.scratch.insert(name.to_string(), s.to_string()))
                    .is_some()
            } else if let Some(name) = key.strip_prefix(ATTEMPT_PREFIX) {
                value
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .map(|n| context.attempts.insert(name.to_string(), n))
                    .is_some()
            } else {
                false
            };

            if !parsed {
                return Err(InvalidContextEntry(key));
            }
        }
        Ok(context)
    }
}
