// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::constants::MAX_BYTES;
use crate::error::RecordError;
use crate::event::{Attributes, Event};
use crate::sink::EventSink;
use crate::transport::Transport;

/// Sends every event on its own, as a one-element array, in the calling thread.
#[derive(Debug, Clone)]
pub struct SingleEventSender {
    transport: Transport,
    clock: Arc<dyn Clock>,
}

impl SingleEventSender {
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        Self::with_clock(transport, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(transport: Transport, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }
}

impl EventSink for SingleEventSender {
    fn record_event(&mut self, name: &str, attributes: Attributes) -> Result<(), RecordError> {
        let json = Event::new(name, self.clock.now_secs(), &attributes).to_json()?;
        let payload = format!("[{json}]");
        if payload.len() > MAX_BYTES {
            return Err(RecordError::EventTooLarge {
                event: name.to_string(),
                size: payload.len(),
                limit: MAX_BYTES,
            });
        }

        self.transport.deliver(&payload);
        Ok(())
    }
}
