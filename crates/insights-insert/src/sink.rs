// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::RecordError;
use crate::event::Attributes;

/// Something that accepts custom events.
///
/// Implementations decide when and how events leave the process: buffered in
/// batches, sent one by one, or handed to an in-process agent. None of them
/// validate attributes; wrap them in [`crate::normalizer::EventRecorder`] for that.
pub trait EventSink {
    fn record_event(&mut self, name: &str, attributes: Attributes) -> Result<(), RecordError>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn record_event(&mut self, name: &str, attributes: Attributes) -> Result<(), RecordError> {
        (**self).record_event(name, attributes)
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record_event(&mut self, name: &str, attributes: Attributes) -> Result<(), RecordError> {
        (**self).record_event(name, attributes)
    }
}
