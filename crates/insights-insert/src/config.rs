// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::sync::Arc;

use crate::api_key::ApiKeyFactory;
use crate::buffer::BatchOptions;
use crate::constants::{account_events_url, DEFAULT_FLUSH_INTERVAL_SECS, REQUEST_TIMEOUT};
use crate::error::ConfigError;
use crate::http::{ClientOptions, ReqwestExecutor};
use crate::transport::{ErrorHandler, RetryStrategy, Transport, TransportConfig};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the insert pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Account id, used to derive the collector URL
    pub account_id: Option<String>,
    /// Insert API key sent in the `X-Insert-Key` header
    pub insert_key: Option<String>,
    /// Full endpoint URL, takes precedence over the account id
    pub insert_url: Option<String>,
    /// Whether TLS certificates are verified
    pub verify_ssl: bool,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Seconds between time-triggered flushes, `None` when disabled
    pub flush_interval_secs: Option<u64>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            account_id: None,
            insert_key: None,
            insert_url: None,
            verify_ssl: true,
            https_proxy: None,
            flush_interval_secs: Some(DEFAULT_FLUSH_INTERVAL_SECS),
            log_level: "info".to_string(),
        }
    }
}

impl IngestConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let account_id = env::var("INSIGHTS_ACCOUNT_ID").ok();
        let insert_key = env::var("INSIGHTS_INSERT_KEY").ok();
        let insert_url = env::var("INSIGHTS_INSERT_URL").ok();
        let verify_ssl = env::var("INSIGHTS_SSL_VERIFY")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(true);
        let https_proxy = env::var("INSIGHTS_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();
        let flush_interval_secs = match env::var("INSIGHTS_FLUSH_INTERVAL") {
            Ok(val) => parse_flush_interval(&val)?,
            Err(_) => Some(DEFAULT_FLUSH_INTERVAL_SECS),
        };
        let log_level = env::var("INSIGHTS_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            account_id,
            insert_key,
            insert_url,
            verify_ssl,
            https_proxy,
            flush_interval_secs,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.insert_url {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "INSIGHTS_INSERT_URL cannot be empty".to_string(),
                ));
            }
        }

        if let Some(account_id) = &self.account_id {
            if account_id.is_empty() || !account_id.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ConfigError::Invalid(format!(
                    "Invalid account id '{account_id}'. Must be numeric"
                )));
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// The collector URL events are posted to.
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        match (&self.insert_url, &self.account_id) {
            (Some(url), _) => Ok(url.clone()),
            (None, Some(account_id)) => Ok(account_events_url(account_id)),
            (None, None) => Err(ConfigError::Missing(
                "INSIGHTS_INSERT_URL or INSIGHTS_ACCOUNT_ID",
            )),
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            flush_interval_secs: self.flush_interval_secs,
            ..BatchOptions::default()
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: REQUEST_TIMEOUT,
            verify_ssl: self.verify_ssl,
            https_proxy: self.https_proxy.clone(),
        }
    }

    /// Builds a transport backed by the blocking reqwest client.
    pub fn transport(&self, error_handler: Option<ErrorHandler>) -> Result<Transport, ConfigError> {
        let url = self.endpoint()?;
        let insert_key = self
            .insert_key
            .as_deref()
            .ok_or(ConfigError::Missing("INSIGHTS_INSERT_KEY"))?;

        Ok(Transport::new(TransportConfig {
            executor: Arc::new(ReqwestExecutor::new(&self.client_options())),
            url,
            api_key_factory: Arc::new(ApiKeyFactory::new_from_static_key(insert_key)),
            error_handler,
            timeout: REQUEST_TIMEOUT,
            retry_strategy: RetryStrategy::default(),
        }))
    }
}

/// `0` disables the timer.
fn parse_flush_interval(val: &str) -> Result<Option<u64>, ConfigError> {
    let secs = val.trim().parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "Invalid flush interval '{val}'. Must be a number of seconds"
        ))
    })?;
    Ok((secs > 0).then_some(secs))
}
