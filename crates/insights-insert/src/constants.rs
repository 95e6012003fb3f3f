// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits of the Insights insert API.
//!
//! The collector rejects payloads that break any of these limits, so every
//! stage of the pipeline checks against them before a request is made:
//! - **Attribute count**: caller-supplied attributes per event
//! - **Attribute length**: bytes per string attribute value
//! - **Batch count**: events per POST request
//! - **Payload size**: bytes per POST request, brackets and commas included

use std::time::Duration;

/// Maximum number of events per POST request.
///
/// A batch holding this many events is flushed before the next event is added.
pub const MAX_EVENTS: usize = 1000;

/// Maximum size in bytes of one POST body.
///
/// This covers the whole JSON array: `[` + comma-joined events + `]`.
/// A single event whose singleton array exceeds this size can never be sent.
pub const MAX_BYTES: usize = 1_048_576;

/// Maximum number of caller-supplied attributes per event.
///
/// The injected `eventType` and `timestamp` do not count against it.
pub const MAX_ATTRIBUTES: usize = 255;

/// Maximum size in bytes of a string attribute value. Longer values are truncated.
pub const MAX_ATTRIBUTE_BYTES: usize = 4096;

/// Maximum number of HTTP attempts for one payload.
pub const RETRY_LIMIT: usize = 5;

/// Timeout applied to every single HTTP attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between time-triggered flushes of the batch buffer.
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 30;

/// Header carrying the insert key.
pub const INSERT_KEY_HEADER: &str = "X-Insert-Key";

/// Attribute name injected with the event name.
pub const EVENT_TYPE_KEY: &str = "eventType";

/// Attribute name injected with the recording time in unix seconds.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Collector host used when only an account id is configured.
pub(crate) const DEFAULT_COLLECTOR_HOST: &str = "https://insights-collector.newrelic.com";

/// Builds the collector URL for an account id.
pub fn account_events_url(account_id: &str) -> String {
    format!("{DEFAULT_COLLECTOR_HOST}/v1/accounts/{account_id}/events")
}
