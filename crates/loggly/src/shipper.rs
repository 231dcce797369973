// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of encoded payloads to the intake.
//!
//! A delivery is one HTTP `POST` of a `text/plain` body: either a single JSON
//! object or a newline-delimited batch. The response status is classified into
//! a [`DeliveryOutcome`] that drives what the caller does with the payload:
//!
//! | response            | outcome              | bulk mode       |
//! |---------------------|----------------------|-----------------|
//! | `200 OK`            | `Success`            | discard         |
//! | `403 Forbidden`     | `AuthRejected`       | requeue         |
//! | no response         | `TransportError`     | requeue         |
//! | anything else       | `OtherStatus(code)`  | drop            |

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, error};

use crate::config::LoggerConfig;
use crate::http::get_client;

/// Result of one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    AuthRejected,
    TransportError(String),
    OtherStatus(u16),
}

impl DeliveryOutcome {
    /// Whether a bulk payload with this outcome goes back into the buffer.
    #[must_use]
    pub fn should_requeue(&self) -> bool {
        matches!(
            self,
            DeliveryOutcome::AuthRejected | DeliveryOutcome::TransportError(_)
        )
    }

    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::OK => DeliveryOutcome::Success,
            StatusCode::FORBIDDEN => DeliveryOutcome::AuthRejected,
            other => DeliveryOutcome::OtherStatus(other.as_u16()),
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Success => write!(f, "shipped"),
            DeliveryOutcome::AuthRejected => write!(f, "token rejected (403)"),
            DeliveryOutcome::TransportError(e) => write!(f, "transport error: {e}"),
            DeliveryOutcome::OtherStatus(code) => write!(f, "unexpected status {code}"),
        }
    }
}

/// Attempts made inside a single delivery. Only transport errors are retried;
/// any HTTP response is final for that delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Up to `n` attempts back to back.
    Immediate(u64),
    /// Up to `n` attempts, waiting `attempt * delay_ms` milliseconds between them.
    LinearBackoff(u64, u64),
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::Immediate(1)
    }
}

impl RetryStrategy {
    #[must_use]
    pub fn attempts(&self) -> u64 {
        match self {
            RetryStrategy::Immediate(attempts) | RetryStrategy::LinearBackoff(attempts, _) => {
                *attempts
            }
        }
    }

    fn delay_after(&self, attempt: u64) -> Option<Duration> {
        match self {
            RetryStrategy::Immediate(_) => None,
            RetryStrategy::LinearBackoff(_, delay_ms) => {
                Some(Duration::from_millis(delay_ms.saturating_mul(attempt)))
            }
        }
    }
}

/// Sends an encoded payload to the intake.
///
/// Implementations never fail past their boundary: every problem is reported
/// through the returned outcome.
#[async_trait]
pub trait Shipper: Send + Sync {
    async fn deliver(&self, payload: Vec<u8>) -> DeliveryOutcome;
}

/// [`Shipper`] posting to a fixed URL over HTTP.
#[derive(Debug, Clone)]
pub struct HttpShipper {
    client: reqwest::Client,
    url: String,
    retry_strategy: RetryStrategy,
}

impl HttpShipper {
    #[must_use]
    pub fn new(client: reqwest::Client, url: String, retry_strategy: RetryStrategy) -> Self {
        HttpShipper {
            client,
            url,
            retry_strategy,
        }
    }

    /// Shipper for the endpoint described by `config`.
    #[must_use]
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::new(
            get_client(config),
            config.endpoint_url(),
            config.retry_strategy,
        )
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, payload: Vec<u8>) -> DeliveryOutcome {
        let result = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(payload)
            .send()
            .await;

        match result {
            Ok(resp) => {
                let status = resp.status();
                // drain the body so the connection goes back to the pool
                let body = resp.text().await.unwrap_or_default();
                let outcome = DeliveryOutcome::from_status(status);
                match &outcome {
                    DeliveryOutcome::Success => debug!("Logs were shipped successfully: {}", status),
                    DeliveryOutcome::AuthRejected => {
                        error!("Token is invalid: {}", status);
                    }
                    _ => error!("{}: Failed to push logs: {:?}", status, body),
                }
                outcome
            }
            Err(e) => DeliveryOutcome::TransportError(e.to_string()),
        }
    }
}

#[async_trait]
impl Shipper for HttpShipper {
    async fn deliver(&self, payload: Vec<u8>) -> DeliveryOutcome {
        let attempts = self.retry_strategy.attempts().max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = self.post(payload.clone()).await;

            let DeliveryOutcome::TransportError(e) = &outcome else {
                return outcome;
            };

            if attempt >= attempts {
                error!(
                    "There was an error shipping the logs after {} attempts: {}",
                    attempt, e
                );
                return outcome;
            }

            debug!("Attempt {} to ship logs failed: {}", attempt, e);
            if let Some(delay) = self.retry_strategy.delay_after(attempt) {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use tracing_test::traced_test;

    fn shipper(url: String, retry_strategy: RetryStrategy) -> HttpShipper {
        HttpShipper::new(reqwest::Client::new(), url, retry_strategy)
    }

    #[tokio::test]
    async fn test_deliver_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/inputs/token/tag/test/")
            .match_header("Content-Type", "text/plain")
            .match_body(r#"{"message":"hi"}"#)
            .with_status(200)
            .create_async()
            .await;

        let shipper = shipper(
            format!("{}/inputs/token/tag/test/", server.url()),
            RetryStrategy::default(),
        );
        let outcome = shipper.deliver(br#"{"message":"hi"}"#.to_vec()).await;

        assert_eq!(outcome, DeliveryOutcome::Success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_deliver_forbidden() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let outcome = shipper(server.url(), RetryStrategy::default())
            .deliver(b"x".to_vec())
            .await;

        assert_eq!(outcome, DeliveryOutcome::AuthRejected);
        assert!(outcome.should_requeue());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_deliver_other_status_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .with_status(500)
            .with_body("Internal Server Error")
            .expect(1)
            .create_async()
            .await;

        let outcome = shipper(server.url(), RetryStrategy::Immediate(3))
            .deliver(b"x".to_vec())
            .await;

        assert_eq!(outcome, DeliveryOutcome::OtherStatus(500));
        assert!(!outcome.should_requeue());
        mock.assert_async().await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failure_is_traced_without_debug_flag() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let config = LoggerConfig {
            base_url: server.url(),
            ..LoggerConfig::new("tok", crate::Level::Info, &["a"], true, false)
        };
        assert!(!config.debug);

        let outcome = HttpShipper::from_config(&config).deliver(b"x".to_vec()).await;

        assert_eq!(outcome, DeliveryOutcome::OtherStatus(500));
        assert!(logs_contain("Failed to push logs"));
    }

    #[tokio::test]
    async fn test_deliver_transport_error() {
        // nothing listens on port 9 of localhost
        let outcome = shipper(
            "http://127.0.0.1:9/bulk/t/tag/x/".to_string(),
            RetryStrategy::LinearBackoff(2, 1),
        )
        .deliver(b"x".to_vec())
        .await;

        assert!(matches!(outcome, DeliveryOutcome::TransportError(_)));
        assert!(outcome.should_requeue());
    }

    #[test]
    fn test_from_status() {
        assert_eq!(
            DeliveryOutcome::from_status(StatusCode::OK),
            DeliveryOutcome::Success
        );
        // only 200 counts as shipped
        assert_eq!(
            DeliveryOutcome::from_status(StatusCode::ACCEPTED),
            DeliveryOutcome::OtherStatus(202)
        );
        assert_eq!(
            DeliveryOutcome::from_status(StatusCode::FORBIDDEN),
            DeliveryOutcome::AuthRejected
        );
    }

    #[test]
    fn test_retry_strategy() {
        assert_eq!(RetryStrategy::default().attempts(), 1);
        assert_eq!(RetryStrategy::LinearBackoff(3, 10).attempts(), 3);
        assert_eq!(
            RetryStrategy::LinearBackoff(3, 10).delay_after(2),
            Some(Duration::from_millis(20))
        );
        assert_eq!(RetryStrategy::Immediate(3).delay_after(2), None);
    }

    #[test]
    fn test_from_config_uses_endpoint() {
        let config = LoggerConfig::new("tok", crate::Level::Info, &["a", "b"], true, false);
        let shipper = HttpShipper::from_config(&config);
        assert_eq!(shipper.url(), "https://logs-01.loggly.com/bulk/tok/tag/a,b/");
    }
}
