// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Severity levels understood by the shipping client.
//!
//! Levels are ordered from most to least verbose. The configured threshold is
//! compared numerically against a call's level: a call is dropped when the
//! threshold is greater than the level's ordinal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::error;

/// Severity of a single log event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Level {
    /// Diagnostic noise, usually disabled in production.
    Debug = 0,
    /// Normal operational events.
    #[default]
    Info = 1,
    /// Something unexpected that the caller recovered from.
    Warn = 2,
    /// A failed operation.
    Error = 3,
    /// Unrecoverable failure. Logging at this level terminates the process.
    Fatal = 4,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns true when a call at `self` passes a configured `threshold`.
    #[must_use]
    pub fn passes(self, threshold: Level) -> bool {
        threshold.ordinal() <= self.ordinal()
    }
}

impl AsRef<str> for Level {
    fn as_ref(&self) -> &str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Case-insensitive parsing. `warning` is accepted as an alias of `warn`.
impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(format!(
                "Invalid log level: '{s}'. Valid levels are: debug, info, warn, error, fatal",
            )),
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        Level::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| format!("Invalid log level ordinal: {value}"))
    }
}

impl Serialize for Level {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_ref())
    }
}

/// Lenient: unknown names or non-string input fall back to `Info` and log an error.
impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        match value {
            Value::String(s) => match Level::from_str(&s) {
                Ok(level) => Ok(level),
                Err(e) => {
                    error!("{}", e);
                    Ok(Level::default())
                }
            },
            Value::Number(n) => match n.as_u64().and_then(|n| u8::try_from(n).ok()) {
                Some(ordinal) => Ok(Level::try_from(ordinal).unwrap_or_default()),
                None => {
                    error!("Expected a level ordinal between 0 and 4, got {}", n);
                    Ok(Level::default())
                }
            },
            other => {
                error!("Expected a string for log level, got {:?}", other);
                Ok(Level::default())
            }
        }
    }
}
