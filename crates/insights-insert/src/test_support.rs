// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Test doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::api_key::ApiKeyFactory;
use crate::error::DeliveryError;
use crate::http::{ExecutorError, HttpExecutor, PostRequest};
use crate::transport::{ErrorHandler, RetryStrategy, Transport, TransportConfig};

pub(crate) const TEST_URL: &str = "https://collector.test/v1/accounts/1/events";

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Answers with queued results, then with `fallback` once the queue is empty.
#[derive(Debug)]
pub(crate) struct ScriptedExecutor {
    script: Mutex<VecDeque<Result<u16, ExecutorError>>>,
    fallback: u16,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedExecutor {
    pub fn always(status: u16) -> Arc<Self> {
        Self::scripted(Vec::new(), status)
    }

    pub fn scripted(script: Vec<Result<u16, ExecutorError>>, fallback: u16) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.requests().into_iter().map(|request| request.body).collect()
    }

    pub fn attempts(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }
}

impl HttpExecutor for ScriptedExecutor {
    fn post(&self, request: PostRequest<'_>) -> Result<u16, ExecutorError> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(RecordedRequest {
                url: request.url.to_string(),
                headers: request
                    .headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                    .collect(),
                body: request.body.to_string(),
            });
        self.script
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or(Ok(self.fallback))
    }
}

/// Error handler that keeps every report.
#[derive(Clone, Default)]
pub(crate) struct ErrorLog {
    reports: Arc<Mutex<Vec<(DeliveryError, String)>>>,
}

impl ErrorLog {
    pub fn handler(&self) -> ErrorHandler {
        let reports = Arc::clone(&self.reports);
        Arc::new(move |error: &DeliveryError, payload: &str| {
            reports
                .lock()
                .expect("lock poisoned")
                .push((error.clone(), payload.to_string()));
        })
    }

    pub fn reports(&self) -> Vec<(DeliveryError, String)> {
        self.reports.lock().expect("lock poisoned").clone()
    }
}

pub(crate) fn transport_with(executor: Arc<ScriptedExecutor>, errors: &ErrorLog) -> Transport {
    Transport::new(TransportConfig {
        executor,
        url: TEST_URL.to_string(),
        api_key_factory: Arc::new(ApiKeyFactory::new_from_static_key("test-insert-key")),
        error_handler: Some(errors.handler()),
        timeout: crate::constants::REQUEST_TIMEOUT,
        retry_strategy: RetryStrategy::default(),
    })
}
