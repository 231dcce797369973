// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while configuring or constructing a logger.
///
/// The logging calls themselves never return these; delivery and encoding
/// failures on the hot path are reported through `tracing` instead.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("LOGGLY_TOKEN environment variable is not set")]
    MissingToken,

    #[error("Failed to encode log message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Logger must be created from within a Tokio runtime")]
    NoRuntime,
}
