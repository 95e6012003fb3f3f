// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Insights Insert
//!
//! Client for the Insights custom event insert API. Events are validated
//! against the API limits, batched into bounded JSON array payloads and
//! delivered over HTTP with a bounded retry policy.
//!
//! ## Pipeline
//!
//! ```text
//! caller ─► EventRecorder ─► BatchBuffer ─┐
//!           (normalizer)     SingleEventSender ─► Transport ─► HttpExecutor
//! ```
//!
//! - [`normalizer`]: attribute count, value length and attribute name checks
//! - [`buffer`]: count, size and time triggered batching
//! - [`single`]: one request per event
//! - [`transport`]: status driven retries and error reporting
//! - [`agent`]: optional in-process agent, feature detected once
//!
//! Everything runs on the calling thread. Validation errors and oversized
//! events are returned from `record_event`; delivery failures are logged and
//! reported to the transport's error handler instead.

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]

pub mod agent;
pub mod api_key;
pub mod buffer;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod http;
pub mod logger;
pub mod normalizer;
pub mod single;
pub mod sink;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use agent::{Agent, AgentBackend};
pub use api_key::ApiKeyFactory;
pub use buffer::{BatchBuffer, BatchOptions};
pub use config::IngestConfig;
pub use error::{ConfigError, DeliveryError, RecordError, ValidationError};
pub use event::{AttributeValue, Attributes};
pub use normalizer::EventRecorder;
pub use single::SingleEventSender;
pub use sink::EventSink;
pub use transport::{ErrorHandler, RetryStrategy, StatusClass, Transport, TransportConfig};
