// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use insights_insert::{
    clock::ManualClock,
    http::{ClientOptions, ReqwestExecutor},
    ApiKeyFactory, Attributes, BatchBuffer, BatchOptions, DeliveryError, ErrorHandler,
    EventRecorder, EventSink, IngestConfig, RecordError, RetryStrategy, SingleEventSender,
    Transport, TransportConfig,
};
use mockito::{Matcher, Server};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Reports = Arc<Mutex<Vec<(DeliveryError, String)>>>;

fn recording_handler() -> (ErrorHandler, Reports) {
    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let handler: ErrorHandler = Arc::new(move |error: &DeliveryError, payload: &str| {
        sink.lock()
            .expect("lock poisoned")
            .push((error.clone(), payload.to_string()));
    });
    (handler, reports)
}

fn transport(url: String, error_handler: ErrorHandler) -> Transport {
    Transport::new(TransportConfig {
        executor: Arc::new(ReqwestExecutor::new(&ClientOptions::default())),
        url,
        api_key_factory: Arc::new(ApiKeyFactory::new_from_static_key("mock-insert-key")),
        error_handler: Some(error_handler),
        timeout: Duration::from_secs(5),
        retry_strategy: RetryStrategy::Immediate(5),
    })
}

fn no_timer() -> BatchOptions {
    BatchOptions {
        flush_interval_secs: None,
        ..BatchOptions::default()
    }
}

#[test]
fn batch_pipeline_ships_events_as_one_array() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/accounts/1/events")
        .match_header("X-Insert-Key", "mock-insert-key")
        .match_header("Content-Type", "application/json")
        .match_body(Matcher::Exact(
            r#"[{"eventType":"login","timestamp":1690000000,"user":"alice"},{"eventType":"login","timestamp":1690000000,"user":"bob","admin":true}]"#
                .to_string(),
        ))
        .with_status(200)
        .expect(1)
        .create();

    let (handler, reports) = recording_handler();
    let buffer = BatchBuffer::with_clock(
        transport(format!("{}/v1/accounts/1/events", server.url()), handler),
        no_timer(),
        Arc::new(ManualClock::new(1_690_000_000)),
    );
    let mut recorder = EventRecorder::new(buffer);

    recorder
        .record_event("login", [("user", "alice")].into_iter().collect())
        .expect("alice is valid");
    let mut bob = Attributes::new();
    bob.insert("user", "bob");
    bob.insert("admin", true);
    recorder.record_event("login", bob).expect("bob is valid");

    drop(recorder);

    mock.assert();
    assert!(reports.lock().expect("lock poisoned").is_empty());
}

#[test]
fn server_errors_are_retried_up_to_the_limit() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/events")
        .with_status(500)
        .expect(5)
        .create();

    let (handler, reports) = recording_handler();
    let url = format!("{}/events", server.url());
    transport(url.clone(), handler).deliver("[{}]");

    mock.assert();
    let reports = reports.lock().expect("lock poisoned");
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0],
        (
            DeliveryError::Rejected {
                url,
                status: 500,
                attempts: 5,
            },
            "[{}]".to_string()
        )
    );
}

#[test]
fn client_error_is_sent_once() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/events")
        .with_status(400)
        .with_body(r#"{"success":false,"error":"Bad payload"}"#)
        .expect(1)
        .create();

    let (handler, reports) = recording_handler();
    transport(format!("{}/events", server.url()), handler).deliver("[{}]");

    mock.assert();
    let reports = reports.lock().expect("lock poisoned");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0.status(), Some(400));
}

#[test]
fn redirect_is_reported_not_followed() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/events")
        .with_status(307)
        .with_header("Location", "/moved")
        .expect(1)
        .create();
    let moved = server.mock("POST", "/moved").expect(0).create();

    let (handler, reports) = recording_handler();
    transport(format!("{}/events", server.url()), handler).deliver("[{}]");

    mock.assert();
    moved.assert();
    assert_eq!(
        reports.lock().expect("lock poisoned")[0].0.status(),
        Some(307)
    );
}

#[test]
fn connection_failure_is_reported_once() {
    let (handler, reports) = recording_handler();
    // Nothing listens on port 1
    transport("http://127.0.0.1:1/events".to_string(), handler).deliver("[{}]");

    let reports = reports.lock().expect("lock poisoned");
    assert_eq!(reports.len(), 1);
    assert!(matches!(reports[0].0, DeliveryError::Transport { .. }));
}

#[test]
fn single_sender_posts_every_event() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/events")
        .match_body(Matcher::Regex(
            r#"^\[\{"eventType":"purchase","timestamp":\d+,"amount":12\.5\}\]$"#.to_string(),
        ))
        .with_status(202)
        .expect(2)
        .create();

    let (handler, _) = recording_handler();
    let mut recorder = EventRecorder::new(SingleEventSender::new(transport(
        format!("{}/events", server.url()),
        handler,
    )));

    for _ in 0..2 {
        recorder
            .record_event("purchase", [("amount", 12.5)].into_iter().collect())
            .expect("valid event");
    }

    mock.assert();
}

#[test]
fn invalid_events_never_reach_the_server() {
    let mut server = Server::new();
    let mock = server.mock("POST", "/events").expect(0).create();

    let (handler, _) = recording_handler();
    let mut recorder = EventRecorder::new(BatchBuffer::new(
        transport(format!("{}/events", server.url()), handler),
        no_timer(),
    ));

    let too_many: Attributes = (0..256).map(|i| (format!("attribute_{i}"), i)).collect();
    assert!(matches!(
        recorder.record_event("test", too_many),
        Err(RecordError::Validation(_))
    ));
    assert!(matches!(
        recorder.record_event("test", [("123", "wrong")].into_iter().collect()),
        Err(RecordError::Validation(_))
    ));
    assert!(recorder.sink().pending_events() == 0);

    drop(recorder);
    mock.assert();
}

#[test]
fn config_builds_a_working_transport() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/custom/events")
        .match_header("X-Insert-Key", "config-key")
        .with_status(200)
        .expect(1)
        .create();

    let config = IngestConfig {
        insert_key: Some("config-key".to_string()),
        insert_url: Some(format!("{}/custom/events", server.url())),
        flush_interval_secs: None,
        ..IngestConfig::default()
    };
    config.validate().expect("valid config");

    let mut buffer = BatchBuffer::new(
        config.transport(None).expect("transport"),
        config.batch_options(),
    );
    buffer
        .record_event("deploy", Attributes::new())
        .expect("valid event");
    buffer.flush();

    mock.assert();
}
