// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use insights_insert::{
    logger::Formatter, AttributeValue, Attributes, BatchBuffer, DeliveryError, ErrorHandler,
    EventRecorder, EventSink, IngestConfig, RecordError, SingleEventSender,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendMode {
    Batch,
    Single,
}

impl SendMode {
    fn from_env() -> Result<Self, String> {
        match env::var("INSIGHTS_SEND_MODE")
            .map(|val| val.to_lowercase())
            .as_deref()
        {
            Ok("batch") | Err(_) => Ok(SendMode::Batch),
            Ok("single") => Ok(SendMode::Single),
            Ok(other) => Err(format!(
                "Invalid send mode '{other}'. Must be one of: batch, single"
            )),
        }
    }
}

pub fn main() -> ExitCode {
    let log_level = env::var("INSIGHTS_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("hyper=off,rustls=off,reqwest=off,{}", log_level);

    let filter = match EnvFilter::try_new(env_filter) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("could not parse log level in configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .event_format(Formatter)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let config = match IngestConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error reading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mode = match SendMode::from_env() {
        Ok(mode) => mode,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let failed_payloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failed_payloads);
    let error_handler: ErrorHandler = Arc::new(move |_: &DeliveryError, _: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let transport = match config.transport(Some(error_handler)) {
        Ok(transport) => transport,
        Err(e) => {
            error!("Error creating transport: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Recording events for {} in {:?} mode", transport.url(), mode);

    let stdin = io::stdin();
    let recorded = match mode {
        SendMode::Batch => {
            BatchBuffer::scoped(transport, config.batch_options(), |buffer| {
                record_lines(stdin.lock(), EventRecorder::new(buffer))
            })
        }
        SendMode::Single => record_lines(
            stdin.lock(),
            EventRecorder::new(SingleEventSender::new(transport)),
        ),
    };

    let failed = failed_payloads.load(Ordering::SeqCst);
    info!("Recorded {recorded} event(s), {failed} payload(s) failed delivery");
    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Records one event per input line and returns how many were accepted.
fn record_lines<R: BufRead, S: EventSink>(input: R, mut recorder: EventRecorder<S>) -> usize {
    let mut recorded = 0;
    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read input: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let (name, attributes) = match parse_line(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping line {line_number}: {e}");
                continue;
            }
        };
        match recorder.record_event(&name, attributes) {
            Ok(()) => recorded += 1,
            Err(e @ (RecordError::Validation(_) | RecordError::EventTooLarge { .. })) => {
                warn!("Skipping line {line_number}: {e}");
            }
            Err(e) => error!("Skipping line {line_number}: {e}"),
        }
    }
    recorded
}

/// Splits a JSON object into the event name (`eventType`) and its attributes.
fn parse_line(line: &str) -> Result<(String, Attributes), String> {
    let mut object: Map<String, Value> =
        serde_json::from_str(line).map_err(|e| format!("not a JSON object: {e}"))?;

    let name = match object.remove("eventType") {
        Some(Value::String(name)) if !name.is_empty() => name,
        Some(_) => return Err("eventType must be a non-empty string".to_string()),
        None => return Err("missing eventType".to_string()),
    };

    let mut attributes = Attributes::new();
    for (key, value) in object {
        let value: AttributeValue = serde_json::from_value(value)
            .map_err(|_| format!("attribute {key} is not a string, number or boolean"))?;
        attributes.insert(key, value);
    }
    Ok((name, attributes))
}
