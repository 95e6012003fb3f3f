// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching of serialized events into bounded JSON array payloads.
//!
//! # Batching Strategy
//!
//! Events are serialized as they are recorded and appended to the current
//! batch. Before an event is appended, the batch is flushed when any of these
//! holds:
//! 1. **Count limit**: the batch already holds `max_events` events (1,000)
//! 2. **Size limit**: the payload would grow past `max_bytes` (1 MiB)
//! 3. **Time limit**: `flush_interval_secs` have passed since the last flush (30 s)
//!
//! The time limit is optional and independent of the other two.
//!
//! # Byte accounting
//!
//! The batch keeps the comma-joined events without brackets. A flushed payload
//! is `[` + content + `]`, so its size is always `content.len() + 2`. Every
//! event after the first adds its own length plus one comma.
//!
//! # Lifetime
//!
//! Whatever is still buffered is flushed when the buffer is dropped, including
//! during a panic unwind. [`BatchBuffer::scoped`] makes that final flush part of
//! the call site.
//!
//! A buffer is not synchronized; use one per thread or wrap it in a mutex.

use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::constants::{DEFAULT_FLUSH_INTERVAL_SECS, MAX_BYTES, MAX_EVENTS};
use crate::error::RecordError;
use crate::event::{Attributes, Event};
use crate::sink::EventSink;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Seconds between time-triggered flushes. `None` disables the timer.
    pub flush_interval_secs: Option<u64>,
    pub max_events: usize,
    pub max_bytes: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            flush_interval_secs: Some(DEFAULT_FLUSH_INTERVAL_SECS),
            max_events: MAX_EVENTS,
            max_bytes: MAX_BYTES,
        }
    }
}

/// Comma-joined serialized events, without the enclosing brackets.
#[derive(Debug, Default)]
struct Batch {
    content: String,
    count: usize,
}

impl Batch {
    fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Size of the payload this batch would flush to.
    fn payload_len(&self) -> usize {
        self.content.len() + 2
    }

    fn push(&mut self, json: &str) {
        if !self.is_empty() {
            self.content.push(',');
        }
        self.content.push_str(json);
        self.count += 1;
    }

    fn take_payload(&mut self) -> String {
        let mut payload = String::with_capacity(self.payload_len());
        payload.push('[');
        payload.push_str(&self.content);
        payload.push(']');
        self.content.clear();
        self.count = 0;
        payload
    }
}

#[derive(Debug)]
struct FlushTimer {
    last_flush_at: u64,
    interval_secs: u64,
}

impl FlushTimer {
    fn is_due(&self, now: u64) -> bool {
        now.saturating_sub(self.last_flush_at) >= self.interval_secs
    }
}

/// Accumulates events and delivers them in batches through a [`Transport`].
#[derive(Debug)]
pub struct BatchBuffer {
    transport: Transport,
    clock: Arc<dyn Clock>,
    batch: Batch,
    timer: Option<FlushTimer>,
    max_events: usize,
    max_bytes: usize,
}

impl BatchBuffer {
    #[must_use]
    pub fn new(transport: Transport, options: BatchOptions) -> Self {
        Self::with_clock(transport, options, Arc::new(SystemClock))
    }

    /// Like [`BatchBuffer::new`], with event timestamps and the flush timer
    /// read from `clock`.
    #[must_use]
    pub fn with_clock(transport: Transport, options: BatchOptions, clock: Arc<dyn Clock>) -> Self {
        let timer = options.flush_interval_secs.map(|interval_secs| FlushTimer {
            last_flush_at: clock.now_secs(),
            interval_secs,
        });
        Self {
            transport,
            clock,
            batch: Batch::default(),
            timer,
            max_events: options.max_events,
            max_bytes: options.max_bytes,
        }
    }

    /// Runs `f` with a fresh buffer and flushes it afterwards on every exit
    /// path, unwinding included.
    ///
    /// ```no_run
    /// use insights_insert::{Attributes, BatchBuffer, BatchOptions, EventRecorder, Transport};
    /// # fn transport() -> Transport { unimplemented!() }
    ///
    /// BatchBuffer::scoped(transport(), BatchOptions::default(), |buffer| {
    ///     let mut recorder = EventRecorder::new(buffer);
    ///     let attributes: Attributes = [("user", "alice")].into_iter().collect();
    ///     recorder.record_event("login", attributes)
    /// })?;
    /// # Ok::<(), insights_insert::RecordError>(())
    /// ```
    pub fn scoped<R>(
        transport: Transport,
        options: BatchOptions,
        f: impl FnOnce(&mut BatchBuffer) -> R,
    ) -> R {
        let mut buffer = BatchBuffer::new(transport, options);
        f(&mut buffer)
    }

    /// Delivers the current batch, if any, and restarts the flush timer.
    pub fn flush(&mut self) {
        if let Some(timer) = &mut self.timer {
            timer.last_flush_at = self.clock.now_secs();
        }
        if self.batch.is_empty() {
            return;
        }

        let count = self.batch.count;
        let payload = self.batch.take_payload();
        debug!("Flushing {} event(s), {} bytes", count, payload.len());
        self.transport.deliver(&payload);
    }

    /// Number of events waiting for the next flush.
    pub fn pending_events(&self) -> usize {
        self.batch.count
    }

    /// Size of the payload the next flush would deliver.
    pub fn pending_bytes(&self) -> usize {
        if self.batch.is_empty() {
            0
        } else {
            self.batch.payload_len()
        }
    }

    fn must_flush_before(&self, json_len: usize) -> bool {
        let contribution = json_len + 1;
        if self.batch.count >= self.max_events {
            return true;
        }
        if self.batch.payload_len() + contribution > self.max_bytes {
            return true;
        }
        self.timer
            .as_ref()
            .is_some_and(|timer| timer.is_due(self.clock.now_secs()))
    }
}

impl EventSink for BatchBuffer {
    fn record_event(&mut self, name: &str, attributes: Attributes) -> Result<(), RecordError> {
        let json = Event::new(name, self.clock.now_secs(), &attributes).to_json()?;

        // A batch of one is `[` + json + `]`
        let singleton_len = json.len() + 2;
        if singleton_len > self.max_bytes {
            return Err(RecordError::EventTooLarge {
                event: name.to_string(),
                size: singleton_len,
                limit: self.max_bytes,
            });
        }

        if self.must_flush_before(json.len()) {
            self.flush();
        }
        self.batch.push(&json);
        Ok(())
    }
}

impl Drop for BatchBuffer {
    fn drop(&mut self) {
        if !self.batch.is_empty() {
            self.flush();
        }
    }
}
