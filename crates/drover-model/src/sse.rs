// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Server-sent-event framing over a complete response body.
//!
//! The transport contract returns whole bodies, so this parser is a plain
//! function rather than an incremental decoder: split on blank lines, collect
//! `event:` / `data:` fields, and hand each frame to the dialect parsers.

/// One raw SSE frame: an optional `event:` name plus the joined `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event_name: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// The `data: [DONE]` sentinel OpenAI-style streams terminate with.
    pub fn is_done(&self) -> bool {
        self.data == "[DONE]"
    }
}

/// Split a complete response body into SSE events.
///
/// An event boundary is a blank line.  Multiple `data:` lines within one event
/// concatenate with `\n`.  Whitespace after the field colon is stripped, `\r`
/// line endings are tolerated, and a trailing event without a terminating
/// blank line is flushed.  Frames that never carried a `data:` line (comments,
/// `id:`/`retry:` fields, bare `event:` lines) are dropped.
pub fn parse_stream(body: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut event_name: Option<String> = None;
    let mut data: Option<String> = None;

    for line in body.lines() {
        if line.is_empty() {
            flush(&mut events, &mut event_name, &mut data);
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event_name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            let payload = rest.trim();
            match &mut data {
                Some(d) => {
                    d.push('\n');
                    d.push_str(payload);
                }
                None if payload.is_empty() => {}
                None => data = Some(payload.to_string()),
            }
        }
        // id:, retry:, and comment lines are ignored.
    }
    flush(&mut events, &mut event_name, &mut data);
    events
}

fn flush(events: &mut Vec<SseEvent>, event_name: &mut Option<String>, data: &mut Option<String>) {
    let name = event_name.take();
    if let Some(data) = data.take() {
        events.push(SseEvent {
            event_name: name,
            data,
        });
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
