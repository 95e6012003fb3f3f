// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// An event was rejected before it reached any sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("There are more than {limit} attributes for the event {event} ({count})")]
    TooManyAttributes {
        event: String,
        count: usize,
        limit: usize,
    },

    #[error("Encountered a numeric event attribute name \"{name}\"")]
    NumericAttributeName { name: String },

    #[error("Attribute \"{name}\" has a non-finite value, which JSON cannot carry")]
    NonFiniteAttributeValue { name: String },
}

/// Errors surfaced synchronously by `record_event`.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Custom event {event} is too big. Limit is: {limit} bytes, Given: {size} bytes")]
    EventTooLarge {
        event: String,
        size: usize,
        limit: usize,
    },

    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a payload was not delivered.
///
/// These are handed to the transport's error handler and never returned to
/// the code that recorded the events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("No insert key could be resolved, payload for {url} dropped")]
    MissingApiKey { url: String },

    #[error("Request to {url} was not successful: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} failed with status {status} after {attempts} attempt(s)")]
    Rejected {
        url: String,
        status: u16,
        attempts: usize,
    },
}

impl DeliveryError {
    pub fn url(&self) -> &str {
        match self {
            Self::MissingApiKey { url }
            | Self::Transport { url, .. }
            | Self::Rejected { url, .. } => url,
        }
    }

    /// Last status code received, if any response was received at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::MissingApiKey { .. } | Self::Transport { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
