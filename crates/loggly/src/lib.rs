// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structured logging shipped to Loggly HTTP inputs.
//!
//! ```no_run
//! use loggly::{Level, Logger, LoggerConfig};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), loggly::LoggerError> {
//! let logger = Logger::new(LoggerConfig::new("token", Level::Info, &["api"], true, false))?;
//! logger.infodf("@UserId unlocked @GachaId", &[json!("u-1"), json!(5)]);
//! logger.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod buffer;
pub mod config;
pub mod error;
pub mod flusher;
pub mod global;
pub mod http;
pub mod level;
pub mod logger;
pub mod message;
pub mod shipper;
pub mod template;
pub mod verb;

pub use config::{LoggerConfig, Mode};
pub use error::LoggerError;
pub use flusher::FlushResult;
pub use global::{setup, setup_logger};
pub use level::Level;
pub use logger::Logger;
pub use message::{LogData, LogMessage};
pub use shipper::{DeliveryOutcome, HttpShipper, RetryStrategy, Shipper};
pub use template::format_data_message;
