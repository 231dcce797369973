// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The logging client.
//!
//! A [`Logger`] gates calls on the configured level, builds a [`LogMessage`]
//! and hands it to one of two paths:
//!
//! - single mode: the message is encoded and posted on its own task;
//! - bulk mode: the message is appended to the shared buffer. A drain runs
//!   when the buffer reaches its threshold and on every tick of a background
//!   scheduler.
//!
//! Every background task runs on a [`TaskTracker`] owned by the logger, so
//! [`Logger::shutdown`] can stop the scheduler, drain what is left and wait for
//! deliveries still in flight.

use std::fmt;
use std::process;
use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::buffer::LogBuffer;
use crate::config::{LoggerConfig, Mode};
use crate::error::LoggerError;
use crate::flusher::{FlushResult, Flusher};
use crate::level::Level;
use crate::message::{LogData, LogMessage};
use crate::shipper::{DeliveryOutcome, HttpShipper, Shipper};
use crate::template::format_data_message;

macro_rules! level_methods {
    ($level:expr, $ln:ident, $f:ident, $d:ident, $df:ident) => {
        #[doc = concat!("Logs `message` at ", stringify!($level), ".")]
        pub fn $ln(&self, message: &str) {
            self.log($level, message);
        }

        #[doc = concat!("Logs preformatted arguments at ", stringify!($level), ", e.g. `format_args!(..)`.")]
        pub fn $f(&self, args: fmt::Arguments<'_>) {
            self.logf($level, args);
        }

        #[doc = concat!("Logs `message` with structured `data` at ", stringify!($level), ".")]
        pub fn $d(&self, message: &str, data: Option<LogData>) {
            self.logd($level, message, data);
        }

        #[doc = concat!("Renders an `@Field` template and logs it at ", stringify!($level), ".")]
        ///
        /// The template is rendered even when the level is disabled, so the
        /// message can be returned; gated calls still pay for formatting.
        pub fn $df(&self, template: &str, values: &[Value]) -> String {
            self.logdf($level, template, values)
        }
    };
}

pub struct Logger {
    config: Arc<LoggerConfig>,
    shipper: Arc<dyn Shipper>,
    flusher: Flusher,
    runtime: Handle,
    tracker: TaskTracker,
    cancel_token: CancellationToken,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("config", &self.config)
            .field("buffered", &self.buffered())
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Builds a logger posting to the endpoint described by `config`.
    ///
    /// Must be called from within a Tokio runtime: background deliveries and
    /// the bulk scheduler are spawned on it. Logging calls themselves may then
    /// come from any thread.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        let shipper = Arc::new(HttpShipper::from_config(&config));
        Self::with_shipper(config, shipper)
    }

    /// Builds a logger delivering through `shipper` instead of HTTP.
    pub fn with_shipper(
        config: LoggerConfig,
        shipper: Arc<dyn Shipper>,
    ) -> Result<Self, LoggerError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| LoggerError::NoRuntime)?;

        let buffer = Arc::new(LogBuffer::new(config.buffer_size));
        let flusher = Flusher::new(buffer, Arc::clone(&shipper), config.requeue_limit);

        let logger = Logger {
            config: Arc::new(config),
            shipper,
            flusher,
            runtime,
            tracker: TaskTracker::new(),
            cancel_token: CancellationToken::new(),
        };

        if logger.config.mode == Mode::Bulk {
            logger.start_scheduler();
        }
        debug!(
            "Logger ready, {:?} mode, level {}",
            logger.config.mode, logger.config.level
        );
        Ok(logger)
    }

    #[must_use]
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Number of messages waiting for the next bulk drain.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.flusher.buffer().len()
    }

    /// Whether a call at `level` would be kept.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        level.passes(self.config.level)
    }

    fn start_scheduler(&self) {
        let flusher = self.flusher.clone();
        let tracker = self.tracker.clone();
        let cancel_token = self.cancel_token.clone();
        let runtime = self.runtime.clone();
        let period = self.config.flush_interval;

        self.tracker.spawn_on(
            async move {
                let mut ticker = interval(period);
                ticker.tick().await; // discard first tick

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let flusher = flusher.clone();
                            tracker.spawn_on(async move {
                                flusher.flush().await;
                            }, &runtime);
                        }
                        () = cancel_token.cancelled() => {
                            debug!("Stopping log flush scheduler");
                            break;
                        }
                    }
                }
            },
            &self.runtime,
        );
    }

    fn spawn_flush(&self) {
        let flusher = self.flusher.clone();
        self.tracker.spawn_on(
            async move {
                flusher.flush().await;
            },
            &self.runtime,
        );
    }

    fn spawn_single(&self, message: &LogMessage) {
        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!("There was an error encoding the log message: {}", e);
                return;
            }
        };

        let shipper = Arc::clone(&self.shipper);
        self.tracker.spawn_on(
            async move {
                if let DeliveryOutcome::TransportError(e) = shipper.deliver(payload).await {
                    debug!("Log message was not delivered: {}", e);
                }
            },
            &self.runtime,
        );
    }

    fn dispatch(&self, level: Level, message: String, data: Option<LogData>) {
        let entry = LogMessage::new(level, message, data);

        if self.config.debug {
            println!("{}", entry.console_line());
        }

        match self.config.mode {
            Mode::Single => self.spawn_single(&entry),
            Mode::Bulk => {
                let buffer = self.flusher.buffer();
                let size = buffer.push(entry);
                if buffer.threshold_reached(size) {
                    self.spawn_flush();
                }
            }
        }

        if level == Level::Fatal {
            process::exit(1);
        }
    }

    pub fn log(&self, level: Level, message: &str) {
        self.logd(level, message, None);
    }

    pub fn logf(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        self.dispatch(level, fmt::format(args), None);
    }

    pub fn logd(&self, level: Level, message: &str, data: Option<LogData>) {
        if !self.enabled(level) {
            return;
        }
        self.dispatch(level, message.to_string(), data);
    }

    /// Renders `template` against `values` and logs the result with the
    /// extracted data. The rendered message is returned whether or not the
    /// level is enabled.
    pub fn logdf(&self, level: Level, template: &str, values: &[Value]) -> String {
        let (message, data) = format_data_message(template, values);
        if self.enabled(level) {
            self.dispatch(level, message.clone(), Some(data));
        }
        message
    }

    level_methods!(Level::Debug, debug, debugf, debugd, debugdf);
    level_methods!(Level::Info, info, infof, infod, infodf);
    level_methods!(Level::Warn, warn, warnf, warnd, warndf);
    level_methods!(Level::Error, error, errorf, errord, errordf);
    level_methods!(Level::Fatal, fatal, fatalf, fatald, fataldf);

    /// Prints `output` to stdout. Never shipped.
    pub fn stdln(&self, output: &str) {
        println!("{output}");
    }

    /// Prints formatted arguments to stdout without a trailing newline. Never shipped.
    pub fn stdf(&self, args: fmt::Arguments<'_>) {
        print!("{args}");
    }

    /// Drains the buffer now and waits for the delivery to finish.
    pub async fn flush(&self) -> FlushResult {
        self.flusher.flush().await
    }

    /// Stops the scheduler, waits for every background delivery to finish,
    /// then drains what is left in the buffer.
    ///
    /// Drains still in flight may requeue their batch, so the final drain
    /// only runs once they are done.
    pub async fn shutdown(self) -> FlushResult {
        self.cancel_token.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        let result = self.flusher.flush().await;
        if let FlushResult::Requeued(n) = result {
            warn!("{} log messages could not be delivered before shutdown", n);
        }
        debug!("Logger shut down, final drain: {:?}", result);
        result
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
