// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of serialized payloads to the insert API with bounded retries.
//!
//! # Retry policy
//!
//! ```text
//!   POST ──► no status (connect/TLS/timeout) ──► report, stop
//!     │
//!     ▼
//!   status class
//!     2xx ──► done
//!     3xx ──► report, stop (redirects are never followed)
//!     4xx ──► report, stop
//!     5xx ──► retry while attempts < limit, then report
//!     other ► report, stop
//! ```
//!
//! Failures are never returned to the caller. They are logged and passed to the
//! configured [`ErrorHandler`] together with the payload, at most once per payload.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::api_key::ApiKeyFactory;
use crate::constants::{INSERT_KEY_HEADER, REQUEST_TIMEOUT, RETRY_LIMIT};
use crate::error::DeliveryError;
use crate::http::{HttpExecutor, PostRequest};

/// Called once for every payload that could not be delivered.
pub type ErrorHandler = Arc<dyn Fn(&DeliveryError, &str) + Send + Sync>;

/// How many attempts a payload gets and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Up to `n` attempts, back to back.
    Immediate(usize),
    /// Up to `n` attempts, waiting `attempt * delay_ms` milliseconds before each retry.
    LinearBackoff(usize, u64),
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::Immediate(RETRY_LIMIT)
    }
}

impl RetryStrategy {
    pub fn max_attempts(&self) -> usize {
        match self {
            RetryStrategy::Immediate(attempts) | RetryStrategy::LinearBackoff(attempts, _) => {
                (*attempts).max(1)
            }
        }
    }

    fn delay_after(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::Immediate(_) => None,
            RetryStrategy::LinearBackoff(_, delay_ms) => {
                let attempt = u64::try_from(attempt).unwrap_or(u64::MAX);
                Some(Duration::from_millis(delay_ms.saturating_mul(attempt)))
            }
        }
    }
}

/// Outcome class of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirect,
    ClientError,
    ServerError,
    Unknown,
}

/// Ordered classification table; codes outside every range are `Unknown`.
const STATUS_RULES: [(u16, u16, StatusClass); 4] = [
    (200, 299, StatusClass::Success),
    (300, 399, StatusClass::Redirect),
    (400, 499, StatusClass::ClientError),
    (500, 599, StatusClass::ServerError),
];

impl StatusClass {
    #[must_use]
    pub fn classify(status: u16) -> Self {
        STATUS_RULES
            .iter()
            .find(|(low, high, _)| (*low..=*high).contains(&status))
            .map_or(StatusClass::Unknown, |(_, _, class)| *class)
    }

    pub fn is_success(self) -> bool {
        self == StatusClass::Success
    }

    pub fn is_retryable(self) -> bool {
        self == StatusClass::ServerError
    }
}

pub struct TransportConfig {
    pub executor: Arc<dyn HttpExecutor>,
    pub url: String,
    pub api_key_factory: Arc<ApiKeyFactory>,
    /// Defaults to a no-op.
    pub error_handler: Option<ErrorHandler>,
    pub timeout: Duration,
    pub retry_strategy: RetryStrategy,
}

/// Sends payloads to one endpoint. Holds no batch state and can be shared
/// between any number of buffers and senders.
#[derive(Clone)]
pub struct Transport {
    executor: Arc<dyn HttpExecutor>,
    url: String,
    api_key_factory: Arc<ApiKeyFactory>,
    error_handler: ErrorHandler,
    timeout: Duration,
    retry_strategy: RetryStrategy,
}

impl Transport {
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Transport {
            executor: config.executor,
            url: config.url,
            api_key_factory: config.api_key_factory,
            error_handler: config
                .error_handler
                .unwrap_or_else(|| Arc::new(|_: &DeliveryError, _: &str| {})),
            timeout: config.timeout,
            retry_strategy: config.retry_strategy,
        }
    }

    /// A transport with the default timeout, retry limit and no-op error handler.
    #[must_use]
    pub fn with_defaults(
        executor: Arc<dyn HttpExecutor>,
        url: impl Into<String>,
        api_key_factory: Arc<ApiKeyFactory>,
    ) -> Self {
        Self::new(TransportConfig {
            executor,
            url: url.into(),
            api_key_factory,
            error_handler: None,
            timeout: REQUEST_TIMEOUT,
            retry_strategy: RetryStrategy::default(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Delivers one serialized payload, retrying server errors.
    ///
    /// Blocks for up to `timeout` per attempt.
    pub fn deliver(&self, payload: &str) {
        let headers = match self.headers() {
            Ok(headers) => headers,
            Err(err) => {
                self.report(&err, payload);
                return;
            }
        };

        let max_attempts = self.retry_strategy.max_attempts();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let time = Instant::now();
            let result = self.executor.post(PostRequest {
                url: &self.url,
                headers: &headers,
                body: payload,
                timeout: self.timeout,
            });
            let elapsed = time.elapsed();

            let status = match result {
                Ok(status) => status,
                Err(err) => {
                    // Transport-level failures are not retried
                    let err = DeliveryError::Transport {
                        url: self.url.clone(),
                        message: err.message,
                    };
                    self.report(&err, payload);
                    return;
                }
            };

            let class = StatusClass::classify(status);
            if class.is_success() {
                debug!(
                    "Delivered {} bytes to {} in {} ms ({} attempt(s))",
                    payload.len(),
                    self.url,
                    elapsed.as_millis(),
                    attempts
                );
                return;
            }

            if class.is_retryable() && attempts < max_attempts {
                warn!(
                    "{}: attempt {} of {} to {} failed, retrying",
                    status, attempts, max_attempts, self.url
                );
                if let Some(delay) = self.retry_strategy.delay_after(attempts) {
                    std::thread::sleep(delay);
                }
                continue;
            }

            let err = DeliveryError::Rejected {
                url: self.url.clone(),
                status,
                attempts,
            };
            self.report(&err, payload);
            return;
        }
    }

    fn headers(&self) -> Result<HeaderMap, DeliveryError> {
        let Some(api_key) = self.api_key_factory.get_api_key() else {
            return Err(DeliveryError::MissingApiKey {
                url: self.url.clone(),
            });
        };
        let api_key = HeaderValue::from_str(api_key).map_err(|_| DeliveryError::Transport {
            url: self.url.clone(),
            message: format!("insert key is not a valid {INSERT_KEY_HEADER} header value"),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(INSERT_KEY_HEADER, api_key);
        Ok(headers)
    }

    fn report(&self, err: &DeliveryError, payload: &str) {
        error!("{err}");
        (self.error_handler)(err, payload);
    }
}

impl Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("retry_strategy", &self.retry_strategy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::http::ExecutorError;
    use crate::test_support::{transport_with, ErrorLog, ScriptedExecutor, TEST_URL};
    use tracing_test::traced_test;

    #[test]
    fn test_status_classification_boundaries() {
        let table = [
            (199, StatusClass::Unknown),
            (200, StatusClass::Success),
            (202, StatusClass::Success),
            (299, StatusClass::Success),
            (300, StatusClass::Redirect),
            (399, StatusClass::Redirect),
            (400, StatusClass::ClientError),
            (499, StatusClass::ClientError),
            (500, StatusClass::ServerError),
            (599, StatusClass::ServerError),
            (600, StatusClass::Unknown),
            (0, StatusClass::Unknown),
        ];
        for (status, expected) in table {
            assert_eq!(StatusClass::classify(status), expected, "status {status}");
        }
    }

    #[test]
    fn test_only_server_errors_are_retryable() {
        for status in [199, 200, 299, 300, 399, 400, 499, 600] {
            assert!(!StatusClass::classify(status).is_retryable(), "status {status}");
        }
        for status in [500, 503, 599] {
            assert!(StatusClass::classify(status).is_retryable(), "status {status}");
        }
    }

    #[test]
    fn test_success_is_single_attempt_without_report() {
        let executor = ScriptedExecutor::always(200);
        let errors = ErrorLog::default();
        let transport = transport_with(executor.clone(), &errors);

        transport.deliver("[{}]");

        assert_eq!(executor.attempts(), 1);
        assert!(errors.reports().is_empty());
    }

    #[test]
    fn test_request_carries_headers_and_payload() {
        let executor = ScriptedExecutor::always(200);
        let transport = transport_with(executor.clone(), &ErrorLog::default());

        transport.deliver(r#"[{"eventType":"login"}]"#);

        let request = &executor.requests()[0];
        assert_eq!(request.url, TEST_URL);
        assert_eq!(request.body, r#"[{"eventType":"login"}]"#);
        assert_eq!(request.headers["content-type"], "application/json");
        assert_eq!(request.headers["x-insert-key"], "test-insert-key");
    }

    #[test]
    #[traced_test]
    fn test_server_errors_exhaust_retry_limit() {
        let executor = ScriptedExecutor::always(500);
        let errors = ErrorLog::default();
        let transport = transport_with(executor.clone(), &errors);

        transport.deliver("[{}]");

        assert_eq!(executor.attempts(), 5);
        let reports = errors.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].0,
            DeliveryError::Rejected {
                url: TEST_URL.to_string(),
                status: 500,
                attempts: 5,
            }
        );
        assert_eq!(reports[0].1, "[{}]");
        assert!(logs_contain("failed with status 500 after 5 attempt(s)"));
    }

    #[test]
    fn test_client_error_is_not_retried() {
        let executor = ScriptedExecutor::always(400);
        let errors = ErrorLog::default();
        let transport = transport_with(executor.clone(), &errors);

        transport.deliver("[{}]");

        assert_eq!(executor.attempts(), 1);
        assert_eq!(errors.reports().len(), 1);
        assert_eq!(errors.reports()[0].0.status(), Some(400));
    }

    #[test]
    fn test_redirect_and_unknown_codes_are_terminal() {
        for status in [301, 199, 600] {
            let executor = ScriptedExecutor::always(status);
            let errors = ErrorLog::default();
            let transport = transport_with(executor.clone(), &errors);

            transport.deliver("[{}]");

            assert_eq!(executor.attempts(), 1, "status {status}");
            assert_eq!(errors.reports().len(), 1, "status {status}");
        }
    }

    #[test]
    fn test_recovers_after_transient_server_error() {
        let executor = ScriptedExecutor::scripted(vec![Ok(503), Ok(502)], 202);
        let errors = ErrorLog::default();
        let transport = transport_with(executor.clone(), &errors);

        transport.deliver("[{}]");

        assert_eq!(executor.attempts(), 3);
        assert!(errors.reports().is_empty());
    }

    #[test]
    fn test_last_status_is_reported() {
        let executor = ScriptedExecutor::scripted(vec![Ok(500), Ok(503)], 404);
        let errors = ErrorLog::default();
        let transport = transport_with(executor.clone(), &errors);

        transport.deliver("[{}]");

        assert_eq!(executor.attempts(), 3);
        assert_eq!(errors.reports()[0].0.status(), Some(404));
    }

    #[test]
    fn test_transport_failure_is_not_retried() {
        let executor = ScriptedExecutor::scripted(
            vec![Err(ExecutorError::new("connection refused"))],
            200,
        );
        let errors = ErrorLog::default();
        let transport = transport_with(executor.clone(), &errors);

        transport.deliver("[{}]");

        assert_eq!(executor.attempts(), 1);
        assert_eq!(
            errors.reports()[0].0,
            DeliveryError::Transport {
                url: TEST_URL.to_string(),
                message: "connection refused".to_string(),
            }
        );
    }

    #[test]
    fn test_unresolved_key_makes_no_attempt() {
        let executor = ScriptedExecutor::always(200);
        let errors = ErrorLog::default();
        let transport = Transport::new(TransportConfig {
            executor: executor.clone(),
            url: TEST_URL.to_string(),
            api_key_factory: Arc::new(ApiKeyFactory::new_from_resolver(Arc::new(|| None))),
            error_handler: Some(errors.handler()),
            timeout: REQUEST_TIMEOUT,
            retry_strategy: RetryStrategy::default(),
        });

        transport.deliver("[{}]");

        assert_eq!(executor.attempts(), 0);
        assert!(matches!(
            errors.reports()[0].0,
            DeliveryError::MissingApiKey { .. }
        ));
    }

    #[test]
    fn test_linear_backoff_uses_its_own_limit() {
        let executor = ScriptedExecutor::always(500);
        let errors = ErrorLog::default();
        let transport = Transport::new(TransportConfig {
            executor: executor.clone(),
            url: TEST_URL.to_string(),
            api_key_factory: Arc::new(ApiKeyFactory::new_from_static_key("key")),
            error_handler: Some(errors.handler()),
            timeout: REQUEST_TIMEOUT,
            retry_strategy: RetryStrategy::LinearBackoff(3, 1),
        });

        transport.deliver("[{}]");

        assert_eq!(executor.attempts(), 3);
        assert_eq!(errors.reports().len(), 1);
    }

    #[test]
    fn test_default_error_handler_is_silent() {
        let executor = ScriptedExecutor::always(500);
        let transport = Transport::with_defaults(
            executor.clone(),
            TEST_URL,
            Arc::new(ApiKeyFactory::new_from_static_key("key")),
        );

        transport.deliver("[{}]");

        assert_eq!(executor.attempts(), 5);
    }

    #[test]
    fn test_retry_strategy_attempts() {
        assert_eq!(RetryStrategy::default(), RetryStrategy::Immediate(5));
        assert_eq!(RetryStrategy::Immediate(0).max_attempts(), 1);
        assert_eq!(RetryStrategy::LinearBackoff(3, 10).max_attempts(), 3);
        assert_eq!(RetryStrategy::Immediate(3).delay_after(1), None);
        assert_eq!(
            RetryStrategy::LinearBackoff(3, 10).delay_after(2),
            Some(Duration::from_millis(20))
        );
    }
}
