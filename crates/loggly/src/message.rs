// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The log event model and its wire encodings.
//!
//! A single event is encoded as one JSON object:
//!
//! ```json
//! {"timestamp":"2024-05-01T12:30:45.123Z","level":"INFO","message":"started","data":null}
//! ```
//!
//! A bulk payload is the newline-delimited concatenation of those objects, one
//! per line, each line newline terminated.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;

use crate::level::Level;

/// Structured key/value data attached to a log event.
pub type LogData = Map<String, Value>;

/// Current UTC time in the format sent to the intake, millisecond precision.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One log event. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogMessage {
    timestamp: String,
    level: Level,
    message: String,
    data: Option<LogData>,
}

impl LogMessage {
    /// Builds a message stamped with the current time.
    #[must_use]
    pub fn new(level: Level, message: impl Into<String>, data: Option<LogData>) -> Self {
        Self::with_timestamp(now_timestamp(), level, message, data)
    }

    #[must_use]
    pub fn with_timestamp(
        timestamp: impl Into<String>,
        level: Level,
        message: impl Into<String>,
        data: Option<LogData>,
    ) -> Self {
        LogMessage {
            timestamp: timestamp.into(),
            level,
            message: message.into(),
            data,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn data(&self) -> Option<&LogData> {
        self.data.as_ref()
    }

    /// Encodes the message as a single JSON object.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Human readable line used for the debug-mode console echo.
    #[must_use]
    pub fn console_line(&self) -> String {
        match &self.data {
            Some(data) => format!(
                "{} [{}] {} {}",
                self.timestamp,
                self.level,
                self.message,
                Value::Object(data.clone())
            ),
            None => format!("{} [{}] {}", self.timestamp, self.level, self.message),
        }
    }
}

/// Encodes `messages` as newline-delimited JSON.
///
/// A message that fails to encode is skipped and reported; the rest of the
/// batch is still encoded. Returns an empty body when nothing could be encoded.
#[must_use]
pub fn encode_batch<'a>(messages: impl IntoIterator<Item = &'a LogMessage>) -> Vec<u8> {
    let mut body = Vec::new();
    for message in messages {
        match message.to_json() {
            Ok(line) => {
                body.extend_from_slice(&line);
                body.push(b'\n');
            }
            Err(e) => {
                error!("Failed to encode buffered log message, skipping it: {}", e);
            }
        }
    }
    body
}
