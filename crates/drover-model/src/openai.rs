// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! OpenAI Chat Completions dialect.  Also serves every OpenAI-compatible
//! gateway — the wire shape is identical, only the endpoint differs.
//!
//! Streams are `data:` chunks under `choices[0].delta`, terminated by the
//! `data: [DONE]` sentinel (handled by the reducer, not here).

use serde_json::{json, Value};

use crate::sse::SseEvent;
use crate::types::{StopReason, StreamEvent, Usage};

pub fn user_message(text: &str) -> Value {
    json!({ "role": "user", "content": text })
}

pub fn assistant_message(text: &str) -> Value {
    json!({ "role": "assistant", "content": text })
}

/// Tool results are `role: "tool"` messages keyed by `tool_call_id`.
pub fn tool_result_message(tool_call_id: &str, content: &str) -> Value {
    json!({
        "role": "tool",
        "tool_call_id": tool_call_id,
        "content": content,
    })
}

pub(crate) fn parse_stream_event(ev: &SseEvent) -> Option<StreamEvent> {
    let v: Value = serde_json::from_str(&ev.data).ok()?;
    let choice = &v["choices"][0];
    let delta = &choice["delta"];

    if let Some(text) = delta["content"].as_str() {
        if !text.is_empty() {
            return Some(StreamEvent::TextDelta(text.to_string()));
        }
    }

    // Tool-call chunks interleave: the first frame carries id + function name
    // (and possibly the opening argument bytes), later frames only arguments.
    if let Some(tc) = delta["tool_calls"].as_array().and_then(|a| a.first()) {
        let id = tc["id"].as_str().unwrap_or("");
        let name = tc["function"]["name"].as_str().unwrap_or("");
        let args = tc["function"]["arguments"].as_str().unwrap_or("");
        if !id.is_empty() || !name.is_empty() {
            return Some(StreamEvent::ToolCallStart {
                id: id.to_string(),
                name: name.to_string(),
                input_delta: if args.is_empty() {
                    None
                } else {
                    Some(args.to_string())
                },
            });
        }
        if !args.is_empty() {
            return Some(StreamEvent::ToolCallDelta(args.to_string()));
        }
        return None;
    }

    if let Some(fr) = choice["finish_reason"].as_str() {
        let usage = v
            .get("usage")
            .filter(|u| !u.is_null())
            .map(parse_usage);
        return Some(StreamEvent::Stop {
            reason: map_finish_reason(fr),
            usage,
        });
    }

    // Usage-only chunk (stream_options.include_usage) arrives with empty choices.
    if let Some(u) = v.get("usage").filter(|u| !u.is_null()) {
        return Some(StreamEvent::Usage(parse_usage(u)));
    }

    None
}

fn parse_usage(u: &Value) -> Usage {
    Usage {
        input_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
        output_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
    }
}

pub(crate) fn map_finish_reason(s: &str) -> Option<StopReason> {
    match s {
        "stop" => Some(StopReason::EndTurn),
        "tool_calls" | "function_call" => Some(StopReason::ToolUse),
        "length" => Some(StopReason::MaxTokens),
        "content_filter" => Some(StopReason::ContentFilter),
        _ => None,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
