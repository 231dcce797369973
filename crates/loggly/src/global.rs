// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide logger.
//!
//! The first successful setup call installs the logger; later calls are
//! no-ops that return the installed instance. Free functions log through the
//! installed logger and do nothing before setup.

use std::fmt;
use std::sync::OnceLock;

use serde_json::Value;
use tracing::debug;

use crate::config::LoggerConfig;
use crate::error::LoggerError;
use crate::flusher::FlushResult;
use crate::level::Level;
use crate::logger::Logger;
use crate::message::LogData;
use crate::template::format_data_message;

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Installs a logger built from `config` unless one is already installed.
pub fn setup(config: LoggerConfig) -> Result<&'static Logger, LoggerError> {
    if let Some(existing) = LOGGER.get() {
        debug!("Logger already set up, ignoring new configuration");
        return Ok(existing);
    }
    let logger = Logger::new(config)?;
    // a concurrent setup may have won the race, its logger is kept
    Ok(LOGGER.get_or_init(|| logger))
}

/// Installs a logger for `token` with the given threshold, tags and flags.
pub fn setup_logger(
    token: &str,
    level: Level,
    tags: &[&str],
    bulk: bool,
    debug: bool,
) -> Result<&'static Logger, LoggerError> {
    setup(LoggerConfig::new(token, level, tags, bulk, debug))
}

/// Installs a logger configured from `LOGGLY_*` environment variables.
pub fn setup_from_env() -> Result<&'static Logger, LoggerError> {
    if let Some(existing) = LOGGER.get() {
        return Ok(existing);
    }
    setup(LoggerConfig::from_env()?)
}

#[must_use]
pub fn logger() -> Option<&'static Logger> {
    LOGGER.get()
}

/// Drains the installed logger's buffer. [`FlushResult::Empty`] before setup.
pub async fn flush() -> FlushResult {
    match LOGGER.get() {
        Some(logger) => logger.flush().await,
        None => FlushResult::Empty,
    }
}

pub fn log(level: Level, message: &str) {
    if let Some(logger) = LOGGER.get() {
        logger.log(level, message);
    }
}

pub fn logf(level: Level, args: fmt::Arguments<'_>) {
    if let Some(logger) = LOGGER.get() {
        logger.logf(level, args);
    }
}

pub fn logd(level: Level, message: &str, data: Option<LogData>) {
    if let Some(logger) = LOGGER.get() {
        logger.logd(level, message, data);
    }
}

/// Renders `template` and logs it. The rendered message is returned even
/// before setup.
pub fn logdf(level: Level, template: &str, values: &[Value]) -> String {
    match LOGGER.get() {
        Some(logger) => logger.logdf(level, template, values),
        None => format_data_message(template, values).0,
    }
}

macro_rules! level_fns {
    ($level:expr, $ln:ident, $f:ident, $d:ident, $df:ident) => {
        pub fn $ln(message: &str) {
            log($level, message);
        }

        pub fn $f(args: fmt::Arguments<'_>) {
            logf($level, args);
        }

        pub fn $d(message: &str, data: Option<LogData>) {
            logd($level, message, data);
        }

        pub fn $df(template: &str, values: &[Value]) -> String {
            logdf($level, template, values)
        }
    };
}

level_fns!(Level::Debug, debug, debugf, debugd, debugdf);
level_fns!(Level::Info, info, infof, infod, infodf);
level_fns!(Level::Warn, warn, warnf, warnd, warndf);
level_fns!(Level::Error, error, errorf, errord, errordf);
level_fns!(Level::Fatal, fatal, fatalf, fatald, fataldf);

/// Prints `output` to stdout.
pub fn stdln(output: &str) {
    println!("{output}");
}

/// Prints formatted arguments to stdout without a trailing newline.
pub fn stdf(args: fmt::Arguments<'_>) {
    print!("{args}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    // The process-wide logger can only be installed once per test binary,
    // so everything touching it lives in this one test.
    #[tokio::test]
    async fn test_first_setup_wins() {
        assert!(logger().is_none());
        assert_eq!(flush().await, FlushResult::Empty);
        // no-op before setup, still renders
        assert_eq!(infodf("@A", &[json!(1)]), "A=1");

        let config = LoggerConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            flush_interval: Duration::from_secs(3600),
            ..LoggerConfig::new("first", Level::Warn, &["one"], true, false)
        };
        let first = setup(config).unwrap();
        assert_eq!(first.config().token, "first");

        let second = setup_logger("second", Level::Debug, &["two"], false, true).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.config().token, "first");
        assert_eq!(second.config().level, Level::Warn);

        info("below threshold");
        warn("kept");
        errord("kept", None);
        assert_eq!(first.buffered(), 2);
    }
}
