// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Optional in-process instrumentation agent.
//!
//! Whether a native agent is available is decided once, when the [`Agent`] is
//! built with [`Agent::detect`]. A [`Agent::Native`] forwards every call to its
//! backend. A [`Agent::Disabled`] drops custom events and transaction calls,
//! and answers `true` wherever the agent would report a boolean outcome, so
//! instrumented code runs the same with or without the agent.

use std::error::Error;
use tracing::debug;

use crate::error::RecordError;
use crate::event::{AttributeValue, Attributes};
use crate::sink::EventSink;

/// Calls understood by a native agent.
pub trait AgentBackend: Send {
    fn record_custom_event(&mut self, name: &str, attributes: &Attributes);

    fn add_custom_parameter(&mut self, key: &str, value: &AttributeValue);

    fn background_job(&mut self, flag: bool);

    fn capture_params(&mut self, enable: bool);

    fn custom_metric(&mut self, metric_name: &str, value: f64);

    fn disable_autorum(&mut self) -> bool;

    fn end_of_transaction(&mut self);

    fn end_transaction(&mut self, ignore: bool);

    fn ignore_apdex(&mut self);

    fn ignore_transaction(&mut self);

    fn name_transaction(&mut self, name: &str) -> bool;

    fn notice_error(&mut self, message: &str, error: &dyn Error);

    /// Times `segment` as a datastore call described by `parameters`.
    fn record_datastore_segment(&mut self, segment: &mut dyn FnMut(), parameters: &Attributes);

    fn set_app_name(&mut self, name: &str, license: Option<&str>, xmit: bool) -> bool;

    fn set_user_attributes(&mut self, user: &str, account: &str, product: &str);

    fn start_transaction(&mut self, app_name: &str, license: Option<&str>);
}

pub enum Agent {
    Native(Box<dyn AgentBackend>),
    Disabled,
}

impl Agent {
    /// Runs `probe` once and keeps whatever it found.
    pub fn detect<F>(probe: F) -> Self
    where
        F: FnOnce() -> Option<Box<dyn AgentBackend>>,
    {
        match probe() {
            Some(backend) => Agent::Native(backend),
            None => {
                debug!("No native agent available, agent calls are dropped");
                Agent::Disabled
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Agent::Native(_))
    }

    pub fn add_custom_parameter(&mut self, key: &str, value: impl Into<AttributeValue>) {
        if let Agent::Native(backend) = self {
            backend.add_custom_parameter(key, &value.into());
        }
    }

    pub fn background_job(&mut self, flag: bool) {
        if let Agent::Native(backend) = self {
            backend.background_job(flag);
        }
    }

    pub fn capture_params(&mut self, enable: bool) {
        if let Agent::Native(backend) = self {
            backend.capture_params(enable);
        }
    }

    pub fn custom_metric(&mut self, metric_name: &str, value: f64) {
        if let Agent::Native(backend) = self {
            backend.custom_metric(metric_name, value);
        }
    }

    pub fn disable_autorum(&mut self) -> bool {
        match self {
            Agent::Native(backend) => backend.disable_autorum(),
            Agent::Disabled => true,
        }
    }

    pub fn end_of_transaction(&mut self) {
        if let Agent::Native(backend) = self {
            backend.end_of_transaction();
        }
    }

    pub fn end_transaction(&mut self, ignore: bool) {
        if let Agent::Native(backend) = self {
            backend.end_transaction(ignore);
        }
    }

    pub fn ignore_apdex(&mut self) {
        if let Agent::Native(backend) = self {
            backend.ignore_apdex();
        }
    }

    pub fn ignore_transaction(&mut self) {
        if let Agent::Native(backend) = self {
            backend.ignore_transaction();
        }
    }

    pub fn name_transaction(&mut self, name: &str) -> bool {
        match self {
            Agent::Native(backend) => backend.name_transaction(name),
            Agent::Disabled => true,
        }
    }

    pub fn notice_error(&mut self, message: &str, error: &dyn Error) {
        if let Agent::Native(backend) = self {
            backend.notice_error(message, error);
        }
    }

    /// Without a native agent the segment is not run.
    pub fn record_datastore_segment(&mut self, segment: &mut dyn FnMut(), parameters: &Attributes) {
        if let Agent::Native(backend) = self {
            backend.record_datastore_segment(segment, parameters);
        }
    }

    pub fn set_app_name(&mut self, name: &str, license: Option<&str>, xmit: bool) -> bool {
        match self {
            Agent::Native(backend) => backend.set_app_name(name, license, xmit),
            Agent::Disabled => true,
        }
    }

    pub fn set_user_attributes(&mut self, user: &str, account: &str, product: &str) {
        if let Agent::Native(backend) = self {
            backend.set_user_attributes(user, account, product);
        }
    }

    pub fn start_transaction(&mut self, app_name: &str, license: Option<&str>) {
        if let Agent::Native(backend) = self {
            backend.start_transaction(app_name, license);
        }
    }
}

impl EventSink for Agent {
    fn record_event(&mut self, name: &str, attributes: Attributes) -> Result<(), RecordError> {
        if let Agent::Native(backend) = self {
            backend.record_custom_event(name, &attributes);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Agent::Native(_) => write!(f, "Agent::Native"),
            Agent::Disabled => write!(f, "Agent::Disabled"),
        }
    }
}
