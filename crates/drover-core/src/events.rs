// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Discriminator for [`RunEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    Start,
    Delta,
    ToolCall,
    ToolResult,
    Compaction,
    Complete,
    Error,
    Abort,
}

/// One event on a run's observable timeline.
///
/// A flat tagged record rather than an enum-with-payloads: every event carries
/// the same addressing fields (`agent_id`, `run_id`, `turn`) and consumers
/// (loggers, UIs, export pipelines) key on `kind` without destructuring.
/// Within a run, `turn` is monotonically non-decreasing.
#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    #[serde(rename = "type")]
    pub kind: RunEventKind,
    pub agent_id: String,
    pub run_id: String,
    pub turn: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RunEvent {
    pub fn new(kind: RunEventKind, agent_id: &str, run_id: &str, turn: u32) -> Self {
        Self {
            kind,
            agent_id: agent_id.to_string(),
            run_id: run_id.to_string(),
            turn,
            text: None,
            tool_name: None,
            tool_call_id: None,
            tool_input: None,
            error_message: None,
        }
    }
}

/// Caller-supplied destination for run events.
///
/// `emit` hands over an owned event and must not block the driving thread.
pub trait EventSink: Send {
    fn emit(&self, event: RunEvent);
}

/// Forward events into an unbounded channel; a closed receiver drops them.
impl EventSink for tokio::sync::mpsc::UnboundedSender<RunEvent> {
    fn emit(&self, event: RunEvent) {
        let _ = self.send(event);
    }
}

/// Sink that stores every event.  Intended for tests and trace capture.
#[derive(Default, Clone)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<RunEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
