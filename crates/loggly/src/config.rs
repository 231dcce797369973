// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LoggerError;
use crate::level::Level;
use crate::shipper::RetryStrategy;

pub const DEFAULT_BASE_URL: &str = "https://logs-01.loggly.com";
pub const DEFAULT_BUFFER_SIZE: usize = 1000;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How accepted messages reach the intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Every message is posted on its own as soon as it is logged.
    #[default]
    Single,
    /// Messages are buffered and posted together on a size threshold or timer.
    Bulk,
}

impl Mode {
    /// Path segment of the intake endpoint for this mode.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Mode::Single => "inputs",
            Mode::Bulk => "bulk",
        }
    }
}

/// Configuration of a [`crate::Logger`]. Immutable once the logger is built.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    /// Customer token identifying the destination account.
    pub token: String,
    /// Calls below this level are dropped before any formatting happens.
    pub level: Level,
    /// Tags attached to every event, sent as part of the endpoint path.
    pub tags: Vec<String>,
    pub mode: Mode,
    /// Echo every accepted line to stdout.
    ///
    /// Only the echo depends on this flag. Delivery diagnostics always go
    /// through `tracing` and are filtered by the host's subscriber.
    pub debug: bool,
    /// Scheme and host of the intake, without trailing slash.
    pub base_url: String,
    /// Buffered message count that triggers a drain in bulk mode. Soft limit.
    pub buffer_size: usize,
    /// Period of the background drain in bulk mode.
    pub flush_interval: Duration,
    /// Upper bound of a single HTTP attempt.
    pub timeout: Duration,
    /// Attempts made inside one delivery before reporting a transport failure.
    pub retry_strategy: RetryStrategy,
    /// How many failed drains a message survives before it is dropped.
    /// `None` keeps requeueing forever.
    pub requeue_limit: Option<u32>,
    pub https_proxy: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            level: Level::default(),
            tags: Vec::new(),
            mode: Mode::default(),
            debug: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            retry_strategy: RetryStrategy::default(),
            requeue_limit: None,
            https_proxy: None,
        }
    }
}

impl LoggerConfig {
    /// Configuration equivalent to the classic setup call: token, threshold,
    /// tags, bulk flag and debug flag, everything else defaulted.
    #[must_use]
    pub fn new(token: &str, level: Level, tags: &[&str], bulk: bool, debug: bool) -> Self {
        Self {
            token: token.to_string(),
            level,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            mode: if bulk { Mode::Bulk } else { Mode::Single },
            debug,
            ..Default::default()
        }
    }

    /// `<base>/<inputs|bulk>/<token>/tag/<tag1,tag2>/`
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}/{}/tag/{}/",
            self.base_url.trim_end_matches('/'),
            self.mode.path(),
            self.token,
            self.tags.join(",")
        )
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, LoggerError> {
        let token = env::var("LOGGLY_TOKEN").map_err(|_| LoggerError::MissingToken)?;
        let level = match env::var("LOGGLY_LEVEL") {
            Ok(val) => Level::from_str(&val).map_err(LoggerError::InvalidConfig)?,
            Err(_) => Level::default(),
        };
        let tags = env::var("LOGGLY_TAGS")
            .map(|val| {
                val.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let mode = if env_flag("LOGGLY_BULK")? {
            Mode::Bulk
        } else {
            Mode::Single
        };
        let debug = env_flag("LOGGLY_DEBUG")?;
        let base_url = env::var("LOGGLY_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let buffer_size = env_number("LOGGLY_BUFFER_SIZE")?.unwrap_or(DEFAULT_BUFFER_SIZE);
        let flush_interval = env_number("LOGGLY_FLUSH_INTERVAL_SECS")?
            .map_or(DEFAULT_FLUSH_INTERVAL, Duration::from_secs);
        let timeout =
            env_number("LOGGLY_TIMEOUT_SECS")?.map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        let requeue_limit = env_number("LOGGLY_REQUEUE_LIMIT")?;
        let https_proxy = env::var("LOGGLY_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();

        let config = Self {
            token,
            level,
            tags,
            mode,
            debug,
            base_url,
            buffer_size,
            flush_interval,
            timeout,
            retry_strategy: RetryStrategy::default(),
            requeue_limit,
            https_proxy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LoggerError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(LoggerError::InvalidConfig(
                "token cannot be empty".to_string(),
            ));
        }
        if token.contains('/') {
            return Err(LoggerError::InvalidConfig(format!(
                "token '{}' cannot contain '/'",
                self.token
            )));
        }

        if let Some(tag) = self
            .tags
            .iter()
            .find(|t| t.trim().is_empty() || t.contains([',', '/']))
        {
            return Err(LoggerError::InvalidConfig(format!(
                "invalid tag '{tag}': tags must be non-empty and cannot contain ',' or '/'"
            )));
        }

        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(LoggerError::InvalidConfig(format!(
                "base URL '{}' must start with http:// or https://",
                self.base_url
            )));
        }

        if self.buffer_size == 0 {
            return Err(LoggerError::InvalidConfig(
                "buffer size must be greater than 0".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(LoggerError::InvalidConfig(
                "flush interval must be greater than 0".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(LoggerError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.retry_strategy.attempts() == 0 {
            return Err(LoggerError::InvalidConfig(
                "retry strategy must allow at least one attempt".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_flag(key: &str) -> Result<bool, LoggerError> {
    match env::var(key) {
        Ok(val) => match val.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(LoggerError::InvalidConfig(format!(
                "{key} must be true or false, got '{other}'"
            ))),
        },
        Err(_) => Ok(false),
    }
}

fn env_number<T: FromStr>(key: &str) -> Result<Option<T>, LoggerError> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| LoggerError::InvalidConfig(format!("{key} must be a number, got '{val}'"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_KEYS: [&str; 11] = [
        "LOGGLY_TOKEN",
        "LOGGLY_LEVEL",
        "LOGGLY_TAGS",
        "LOGGLY_BULK",
        "LOGGLY_DEBUG",
        "LOGGLY_URL",
        "LOGGLY_BUFFER_SIZE",
        "LOGGLY_FLUSH_INTERVAL_SECS",
        "LOGGLY_TIMEOUT_SECS",
        "LOGGLY_REQUEUE_LIMIT",
        "LOGGLY_PROXY_HTTPS",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
        env::remove_var("HTTPS_PROXY");
    }

    #[test]
    fn test_single_endpoint_url() {
        let config = LoggerConfig::new("abc-123", Level::Info, &["web", "prod"], false, false);
        assert_eq!(
            config.endpoint_url(),
            "https://logs-01.loggly.com/inputs/abc-123/tag/web,prod/"
        );
    }

    #[test]
    fn test_bulk_endpoint_url() {
        let mut config = LoggerConfig::new("abc-123", Level::Info, &["test"], true, false);
        config.base_url = "http://127.0.0.1:1234/".to_string();
        assert_eq!(
            config.endpoint_url(),
            "http://127.0.0.1:1234/bulk/abc-123/tag/test/"
        );
    }

    #[test]
    fn test_endpoint_url_without_tags() {
        let config = LoggerConfig::new("t", Level::Debug, &[], false, false);
        assert_eq!(
            config.endpoint_url(),
            "https://logs-01.loggly.com/inputs/t/tag//"
        );
    }

    #[test]
    fn test_new_defaults() {
        let config = LoggerConfig::new("t", Level::Warn, &["a"], true, true);
        assert_eq!(config.mode, Mode::Bulk);
        assert!(config.debug);
        assert_eq!(config.buffer_size, 1000);
        assert_eq!(config.flush_interval, Duration::from_secs(10));
        assert_eq!(config.requeue_limit, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_token() {
        let config = LoggerConfig::default();
        assert!(matches!(
            config.validate(),
            Err(LoggerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_bad_tag() {
        let config = LoggerConfig::new("t", Level::Info, &["a,b"], false, false);
        assert!(config.validate().is_err());
        let config = LoggerConfig::new("t", Level::Info, &[" "], false, false);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_values() {
        let base = LoggerConfig::new("t", Level::Info, &[], true, false);
        let config = LoggerConfig {
            buffer_size: 0,
            ..base.clone()
        };
        assert!(config.validate().is_err());
        let config = LoggerConfig {
            flush_interval: Duration::ZERO,
            ..base.clone()
        };
        assert!(config.validate().is_err());
        let config = LoggerConfig {
            timeout: Duration::ZERO,
            ..base.clone()
        };
        assert!(config.validate().is_err());
        let config = LoggerConfig {
            retry_strategy: RetryStrategy::Immediate(0),
            ..base
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_base_url() {
        let config = LoggerConfig {
            base_url: "logs-01.loggly.com".to_string(),
            ..LoggerConfig::new("t", Level::Info, &[], false, false)
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_requires_token() {
        clear_env();
        assert!(matches!(
            LoggerConfig::from_env(),
            Err(LoggerError::MissingToken)
        ));
    }

    #[test]
    #[serial]
    fn test_from_env_with_defaults() {
        clear_env();
        env::set_var("LOGGLY_TOKEN", "env-token");

        let config = LoggerConfig::from_env().unwrap();
        assert_eq!(config.token, "env-token");
        assert_eq!(config.level, Level::Info);
        assert!(config.tags.is_empty());
        assert_eq!(config.mode, Mode::Single);
        assert!(!config.debug);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.https_proxy, None);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("LOGGLY_TOKEN", "env-token");
        env::set_var("LOGGLY_LEVEL", "WARN");
        env::set_var("LOGGLY_TAGS", "api, worker,,");
        env::set_var("LOGGLY_BULK", "true");
        env::set_var("LOGGLY_DEBUG", "1");
        env::set_var("LOGGLY_BUFFER_SIZE", "50");
        env::set_var("LOGGLY_FLUSH_INTERVAL_SECS", "2");
        env::set_var("LOGGLY_REQUEUE_LIMIT", "3");
        env::set_var("HTTPS_PROXY", "http://proxy:3128");

        let config = LoggerConfig::from_env().unwrap();
        assert_eq!(config.level, Level::Warn);
        assert_eq!(config.tags, vec!["api".to_string(), "worker".to_string()]);
        assert_eq!(config.mode, Mode::Bulk);
        assert!(config.debug);
        assert_eq!(config.buffer_size, 50);
        assert_eq!(config.flush_interval, Duration::from_secs(2));
        assert_eq!(config.requeue_limit, Some(3));
        assert_eq!(config.https_proxy.as_deref(), Some("http://proxy:3128"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_values() {
        clear_env();
        env::set_var("LOGGLY_TOKEN", "env-token");
        env::set_var("LOGGLY_BUFFER_SIZE", "lots");
        assert!(LoggerConfig::from_env().is_err());

        env::remove_var("LOGGLY_BUFFER_SIZE");
        env::set_var("LOGGLY_BULK", "sometimes");
        assert!(LoggerConfig::from_env().is_err());

        env::remove_var("LOGGLY_BULK");
        env::set_var("LOGGLY_LEVEL", "verbose");
        assert!(LoggerConfig::from_env().is_err());

        clear_env();
    }
}
