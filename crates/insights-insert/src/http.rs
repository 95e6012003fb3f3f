// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The HTTP executor seam.
//!
//! The transport never talks to an HTTP library directly. It builds a
//! [`PostRequest`] per attempt and asks an [`HttpExecutor`] to run it. The
//! executor reports either the status code it received or a transport-level
//! failure (DNS, connect, TLS, timeout) when no status code was obtained.
//!
//! [`ReqwestExecutor`] is the production implementation, built on the blocking
//! reqwest client. Every attempt opens its own request and the response is
//! released before the call returns, so a retry always starts from a fresh request.

use reqwest::header::HeaderMap;
use std::error::Error;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, error};

/// One POST attempt.
#[derive(Debug, Clone, Copy)]
pub struct PostRequest<'a> {
    pub url: &'a str,
    pub headers: &'a HeaderMap,
    pub body: &'a str,
    pub timeout: Duration,
}

/// No status code was obtained for a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutorError {
    pub message: String,
    pub is_timeout: bool,
    pub is_connect: bool,
}

impl ExecutorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_timeout: false,
            is_connect: false,
        }
    }
}

impl From<reqwest::Error> for ExecutorError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's Display stops at the outermost layer; the cause chain names
        // the actual connect or TLS failure.
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            message,
            is_timeout: err.is_timeout(),
            is_connect: err.is_connect(),
        }
    }
}

pub trait HttpExecutor: Debug + Send + Sync {
    /// Performs one POST and returns the response status code.
    fn post(&self, request: PostRequest<'_>) -> Result<u16, ExecutorError>;
}

/// Options for the production client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub https_proxy: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: crate::constants::REQUEST_TIMEOUT,
            verify_ssl: true,
            https_proxy: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: reqwest::blocking::Client,
}

impl ReqwestExecutor {
    #[must_use]
    pub fn new(options: &ClientOptions) -> Self {
        Self {
            client: get_client(options),
        }
    }

    #[must_use]
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestExecutor {
    fn default() -> Self {
        Self::new(&ClientOptions::default())
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn post(&self, request: PostRequest<'_>) -> Result<u16, ExecutorError> {
        let response = self
            .client
            .post(request.url)
            .headers(request.headers.clone())
            .timeout(request.timeout)
            .body(request.body.to_owned())
            .send()?;

        let status = response.status();
        // Don't read the body unless it explains a failure
        if !status.is_success() {
            debug!(
                "{}: response body from {}: {:?}",
                status,
                request.url,
                response.text().unwrap_or_default()
            );
        }
        Ok(status.as_u16())
    }
}

/// Builds the blocking client, falling back to a direct connection when the
/// proxy configuration can't be used.
#[must_use]
pub fn get_client(options: &ClientOptions) -> reqwest::blocking::Client {
    match build_client(options, true) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match build_client(options, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "Failed to build HTTP client without proxy: {}, using reqwest defaults",
                        inner
                    );
                    reqwest::blocking::Client::new()
                }
            }
        }
    }
}

fn build_client(
    options: &ClientOptions,
    allow_proxy: bool,
) -> Result<reqwest::blocking::Client, Box<dyn Error>> {
    let mut client = reqwest::blocking::Client::builder()
        .timeout(options.timeout)
        .danger_accept_invalid_certs(!options.verify_ssl)
        // Redirects are answered with a terminal failure, never followed
        .redirect(reqwest::redirect::Policy::none());

    if allow_proxy {
        if let Some(https_uri) = &options.https_proxy {
            client = client.proxy(reqwest::Proxy::https(https_uri.as_str())?);
        }
    }

    Ok(client.build()?)
}
