// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Attribute validation and truncation applied before an event reaches a sink.
//!
//! The checks run in a fixed order:
//! 1. attribute count (on the caller's map, before anything is injected)
//! 2. truncation of long string values
//! 3. numeric attribute names
//! 4. non-finite float values (NaN and infinities have no JSON form)
//!
//! Truncation happens before the name check, so an event that is about to be
//! rejected for a numeric name has already had its values shortened.

use tracing::{debug, warn};

use crate::constants::{MAX_ATTRIBUTES, MAX_ATTRIBUTE_BYTES};
use crate::error::{RecordError, ValidationError};
use crate::event::{AttributeValue, Attributes};
use crate::sink::EventSink;

/// Validates and truncates the attributes of event `name`.
pub fn normalize(name: &str, mut attributes: Attributes) -> Result<Attributes, ValidationError> {
    if attributes.len() > MAX_ATTRIBUTES {
        return Err(ValidationError::TooManyAttributes {
            event: name.to_string(),
            count: attributes.len(),
            limit: MAX_ATTRIBUTES,
        });
    }

    truncate_long_values(name, &mut attributes);

    let numeric_names: Vec<&str> = attributes
        .keys()
        .filter(|key| is_numeric_name(key))
        .collect();
    if let Some(first) = numeric_names.first() {
        debug!(
            "Event {name} has {} numeric attribute name(s)",
            numeric_names.len()
        );
        return Err(ValidationError::NumericAttributeName {
            name: (*first).to_string(),
        });
    }

    if let Some((key, _)) = attributes
        .iter()
        .find(|(_, value)| matches!(value, AttributeValue::Float(f) if !f.is_finite()))
    {
        return Err(ValidationError::NonFiniteAttributeValue {
            name: key.to_string(),
        });
    }

    Ok(attributes)
}

fn truncate_long_values(name: &str, attributes: &mut Attributes) {
    for value in attributes.values_mut() {
        if let AttributeValue::String(text) = value {
            if text.len() > MAX_ATTRIBUTE_BYTES {
                warn!(
                    "Attribute value of event {name} exceeds {MAX_ATTRIBUTE_BYTES} bytes ({}), truncating",
                    text.len()
                );
                truncate_at_char_boundary(text, MAX_ATTRIBUTE_BYTES);
            }
        }
    }
}

/// Cuts `text` to at most `max_bytes`, backing off to the previous char boundary.
fn truncate_at_char_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

/// Returns true for names that read as a number: `"42"`, `"45.6"`, `" -1e3"`, `".5"`.
///
/// Surrounding whitespace and a sign are allowed, hexadecimal is not.
pub fn is_numeric_name(name: &str) -> bool {
    let trimmed = name.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C'));
    let bytes = trimmed.as_bytes();
    let len = bytes.len();
    let skip_digits = |mut i: usize| {
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_end = skip_digits(i);
    let mut digits = int_end - i;
    i = int_end;

    if i < len && bytes[i] == b'.' {
        let frac_end = skip_digits(i + 1);
        digits += frac_end - (i + 1);
        i = frac_end;
    }
    if digits == 0 {
        return false;
    }

    if i < len && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < len && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_end = skip_digits(i);
        if exp_end == i {
            return false;
        }
        i = exp_end;
    }

    i == len
}

/// Caller-facing entry point: normalizes every event, then hands it to a sink.
#[derive(Debug)]
pub struct EventRecorder<S> {
    sink: S,
}

impl<S: EventSink> EventRecorder<S> {
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Records a custom event.
    ///
    /// Validation failures and oversized events are returned here; delivery
    /// failures never are.
    pub fn record_event(&mut self, name: &str, attributes: Attributes) -> Result<(), RecordError> {
        let attributes = normalize(name, attributes)?;
        self.sink.record_event(name, attributes)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}
